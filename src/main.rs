use anyhow::{bail, Context, Result};
use recipe_muse::api_connection::CompletionGateway;
use recipe_muse::cli::{parse_args, Command};
use recipe_muse::config::Config;
use recipe_muse::location::{FixedPosition, GeolocationAdapter, IpPositionSource, NominatimResolver};
use recipe_muse::session::{PreferenceSlot, SessionController};
use recipe_muse::terminal::run_terminal;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn build_controller(config: &Config) -> Result<SessionController> {
    let gateway = CompletionGateway::new(config.gateway_settings())
        .context("Failed to build the completion client")?;
    info!(model = gateway.model(), endpoint = %config.endpoint, "completion gateway ready");

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build the HTTP client")?;
    let resolver = NominatimResolver::new(http.clone(), &config.geocoder_url, &config.user_agent);

    let geolocation = match (&config.fixed_position, &config.ip_location_url) {
        (Some(coordinates), _) => GeolocationAdapter::new(Arc::new(FixedPosition(*coordinates))),
        (None, Some(url)) => GeolocationAdapter::new(Arc::new(IpPositionSource::new(http, url.clone()))),
        (None, None) => GeolocationAdapter::unsupported(),
    }
    .with_deadline(config.location_timeout);

    Ok(SessionController::new(
        Arc::new(gateway),
        Arc::new(resolver),
        geolocation,
        config.controller_settings(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok(); // Load .env file for API keys

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let config = Config::from_args(&cli.settings).context("Configuration error")?;
    let mut controller = build_controller(&config)?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_terminal(controller).await?,
        Command::Suggest => {
            controller.mount().await;
            let placeholder = &controller.state().placeholder_text;
            if placeholder.is_empty() {
                bail!("No suggestion could be generated");
            }
            println!("{}", placeholder);
        }
        Command::Generate { prompt, meal, flavors } => {
            if flavors.len() > 2 {
                warn!(extra = flavors.len() - 2, "only the first two flavors are used");
            }
            controller.set_input(prompt);
            controller.set_preference(PreferenceSlot::MealType, meal.as_deref());
            for (slot, flavor) in [PreferenceSlot::FlavorOne, PreferenceSlot::FlavorTwo].into_iter().zip(&flavors) {
                controller.set_preference(slot, Some(flavor.as_str()));
            }

            if !controller.confirm().await {
                bail!("Nothing to generate from an empty prompt");
            }
            let state = controller.state();
            match (&state.recipe_output, &state.last_error) {
                (Some(recipe), _) => println!("{}", recipe),
                (None, Some(error)) => bail!("{}", error),
                (None, None) => bail!("No recipe was returned"),
            }
        }
    }

    Ok(())
}
