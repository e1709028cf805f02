#![allow(clippy::type_complexity)]

mod app;
mod cli;
mod ops;

use std::process::ExitCode;

use app::PaintRingApp;
use clap::Parser;
use eframe::egui;
use paintring::logger;
use paintring::settings::PaintSettings;

fn main() -> ExitCode {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        let args = match cli::CliArgs::try_parse() {
            Ok(args) => args,
            Err(e) => {
                // --help and --version are not failures.
                let _ = e.print();
                return if e.use_stderr() {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                };
            }
        };
        logger::init_console(args.verbose);
        return cli::run(args);
    }

    // -- Window mode -----------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let settings = PaintSettings::load();
    let size = settings.canvas_size();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([
                (size.width as f32 + 40.0).max(640.0),
                (size.height as f32 + 100.0).max(480.0),
            ])
            .with_title("PaintRing"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "PaintRing",
        options,
        Box::new(move |cc| Box::new(PaintRingApp::new(cc, settings))),
    );
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("window failed: {e}");
            if let Some(path) = logger::log_path() {
                eprintln!("session log: {}", path.display());
            }
            ExitCode::FAILURE
        }
    }
}
