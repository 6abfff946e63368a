use clap::Parser;
use vultitool::cli::{output, Cli, Commands};
use vultitool::crypto::CancelToken;
use vultitool::pipeline::Context;

fn main() {
    let cli = Cli::parse();

    let cancel = CancelToken::new();
    let ctx = Context::new(vultitool::logging::dispatch(cli.verbose), cancel.clone());

    // First Ctrl-C asks running derivations to stop; a second one exits.
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            std::process::exit(130);
        }
        handler_token.cancel();
        output::warning("Cancelling (press Ctrl-C again to exit immediately)");
    }) {
        output::warning(&format!("cannot install Ctrl-C handler: {e}"));
    }

    let result = match cli.command {
        Commands::Decrypt {
            ref files,
            ref passphrase,
            ref output,
            ref output_dir,
            ref format,
        } => vultitool::cli::commands::decrypt::execute(
            &cli,
            &ctx,
            files,
            passphrase,
            output.as_deref(),
            output_dir.as_deref(),
            format.as_deref(),
        ),
        Commands::Inspect {
            ref file,
            json,
            show_keyshares,
        } => vultitool::cli::commands::inspect::execute(file, json, show_keyshares),
        Commands::Validate {
            ref file,
            strict,
            ref passphrase,
        } => vultitool::cli::commands::validate::execute(&cli, &ctx, file, passphrase, strict),
        Commands::Version => vultitool::cli::commands::version::execute(),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}
