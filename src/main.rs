use log::error;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use spacemol::catalog::Catalog;
use spacemol::cli::cli_main::run_interactive_menu;
use spacemol::fixtures::{self, DatasetManager};

fn main() {
    let _ = TermLogger::init(
        LevelFilter::Warn,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    let manager = DatasetManager::new();
    let (molecules, sources, telescopes) = match fixtures::load_dataset(manager.config()) {
        Ok(dataset) => dataset,
        Err(e) => {
            error!("Could not load the dataset fixtures: {}", e);
            std::process::exit(1);
        }
    };

    let catalog = match Catalog::build(molecules, sources, telescopes) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Could not build the catalog: {}", e);
            std::process::exit(1);
        }
    };

    run_interactive_menu(&catalog);
}
