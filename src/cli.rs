use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::api_connection::endpoints::{DEFAULT_MODEL, OPENROUTER_CHAT_COMPLETIONS_URL};
use crate::config::DEFAULT_API_KEY_ENV_VAR;
use crate::location::resolver::NOMINATIM_BASE_URL;
use crate::prompt_builder::SuggestionKind;

#[derive(Parser, Debug)]
#[command(author, version, about = "Seasonal recipe ideas from a language model", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive session (the default)
    Chat,
    /// Print one placeholder suggestion and exit
    Suggest,
    /// Generate one recipe and print it as markdown
    Generate {
        /// What to cook, or the ingredients at hand
        prompt: String,
        /// Meal type, e.g. breakfast or dinner
        #[arg(long)]
        meal: Option<String>,
        /// Flavor tag; may be given twice
        #[arg(long = "flavor")]
        flavors: Vec<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionMode {
    Recipe,
    Ingredients,
}

impl From<SuggestionMode> for SuggestionKind {
    fn from(mode: SuggestionMode) -> Self {
        match mode {
            SuggestionMode::Recipe => SuggestionKind::RecipeName,
            SuggestionMode::Ingredients => SuggestionKind::IngredientList,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Environment variable that holds the completion API key
    #[arg(long, default_value = DEFAULT_API_KEY_ENV_VAR)]
    pub api_key_env: String,

    /// Chat completions endpoint (OpenAI-compatible)
    #[arg(long, env = "RECIPE_MUSE_ENDPOINT", default_value = OPENROUTER_CHAT_COMPLETIONS_URL)]
    pub endpoint: String,

    #[arg(long, env = "RECIPE_MUSE_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of a Nominatim-compatible reverse geocoder
    #[arg(long, env = "RECIPE_MUSE_GEOCODER_URL", default_value = NOMINATIM_BASE_URL)]
    pub geocoder_url: String,

    #[arg(long, env = "RECIPE_MUSE_LAT", allow_hyphen_values = true, requires = "lon")]
    pub lat: Option<f64>,

    #[arg(long, env = "RECIPE_MUSE_LON", allow_hyphen_values = true, requires = "lat")]
    pub lon: Option<f64>,

    /// IP geolocation endpoint used when no coordinates are given
    #[arg(long, env = "RECIPE_MUSE_IP_LOCATION_URL")]
    pub ip_location_url: Option<String>,

    /// Seconds between placeholder refreshes while there is input
    #[arg(long, env = "RECIPE_MUSE_REFRESH_SECS", default_value_t = 15)]
    pub refresh_secs: u64,

    #[arg(long, default_value_t = 10)]
    pub location_timeout_secs: u64,

    #[arg(long, default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// What the placeholder suggests
    #[arg(long, value_enum, default_value_t = SuggestionMode::Recipe)]
    pub suggest: SuggestionMode,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
