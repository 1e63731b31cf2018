use typedxml::cli;
use typedxml::errors::Error;

fn main() {
    let command_line_interface = cli::CommandLineInterface::load();
    if let Err(error) = command_line_interface.run() {
        // engine errors get the full What/Why/Where report
        match error.downcast_ref::<Error>() {
            Some(engine_error) => eprintln!("{}", engine_error.render()),
            None => eprintln!("{error:#}"),
        }
        std::process::exit(1);
    }
}
