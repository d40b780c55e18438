use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mealtimer-cli", version, about = "Mealtimer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Meal and timer authoring
    Meal {
        #[command(subcommand)]
        action: commands::meal::MealAction,
    },
    /// Finish-offset and total-time estimates for a meal
    Estimate {
        /// Meal name or id prefix
        meal: String,
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Run a cooking session for a meal
    Cook {
        /// Meal name or id prefix
        meal: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Meal { action } => commands::meal::run(action),
        Commands::Estimate { meal, json } => commands::estimate::run(&meal, json),
        Commands::Cook { meal } => commands::cook::run(&meal),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
