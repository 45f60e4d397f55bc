use teamplify_core::{RunnerError, events, init_logging};

mod app;
mod commands;

fn main() {
    let app = app::build_cli();
    let matches = app.get_matches();

    let verbose = matches.get_flag("verbose");
    init_logging(verbose);

    if let Err(e) = commands::run_command(&matches) {
        events::log_app_error(e.as_ref());
        eprintln!("{}", e);

        // A failed docker step passes its own exit code through.
        let code = e
            .downcast_ref::<RunnerError>()
            .map(RunnerError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
