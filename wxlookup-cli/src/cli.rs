use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use wxlookup_core::{
    Config, Geolocator, SearchOrigin, SearchOutcome, SearchSession, Units, provider_from_config,
};

use crate::display::{self, DisplayOptions};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "wxlookup", version, about = "Current weather and 5-day forecast")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and preferred units.
    Configure,

    /// Show weather for a city name or a "lat,lon" pair.
    Show {
        /// City name or coordinates, e.g. New York or "51.5,-0.12".
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        query: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show weather for the current location.
    Locate {
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Show metric temperatures in Fahrenheit.
    #[arg(short, long)]
    pub fahrenheit: bool,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,

    /// Override the configured units: metric, imperial or standard.
    #[arg(long)]
    pub units: Option<String>,
}

impl OutputArgs {
    fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(units) = &self.units {
            config.units = Units::try_from(units.as_str())?;
        }
        Ok(())
    }
}

impl From<&OutputArgs> for DisplayOptions {
    fn from(args: &OutputArgs) -> Self {
        DisplayOptions {
            fahrenheit: args.fahrenheit,
            json: args.json,
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { query, output } => show(&query.join(" "), &output).await,
            Command::Locate { output } => locate(&output).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()
        .context("API key prompt was cancelled")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key);
    } else if !config.is_configured() {
        bail!("An API key is required. Get one at https://openweathermap.org/api");
    }

    let units = Units::all();
    let cursor = units.iter().position(|u| *u == config.units).unwrap_or(0);
    config.units = Select::new("Units:", units.to_vec())
        .with_starting_cursor(cursor)
        .prompt()
        .context("Units prompt was cancelled")?;

    let path = config.save()?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

async fn show(query: &str, output: &OutputArgs) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    output.apply(&mut config)?;
    let session = SearchSession::new(provider_from_config(&config)?);
    tracing::debug!(query, units = %config.units, "manual search");

    if let SearchOutcome::Ignored = session.search(query, SearchOrigin::Manual).await {
        bail!("Please enter a city name or coordinates.");
    }

    let state = session.state();
    if let Some(error) = &state.error {
        bail!("{error}");
    }
    display::print_state(&state, &output.into())
}

async fn locate(output: &OutputArgs) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    output.apply(&mut config)?;
    let session = SearchSession::new(provider_from_config(&config)?);
    let geolocator = Geolocator::from_config(&config.geolocation);
    tracing::debug!(options = ?geolocator.options(), "locating");

    // Only geolocation failures reach the user here; fetch failures stay silent.
    if let Err(err) = session.locate_and_search(&geolocator).await {
        bail!("{err}");
    }

    let state = session.state();
    if state.current.is_none() {
        println!("No weather to show for your location. Try `wxlookup show <city>`.");
        return Ok(());
    }
    display::print_state(&state, &output.into())
}
