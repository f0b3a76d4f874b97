//! Login command implementation

use colored::Colorize;
use dialoguer::{Input, Password, theme::ColorfulTheme};
use serde::Serialize;

use crate::auth::{Identity, OAuthConfig, PromptDevice, TokenSet};
use crate::config::TokenConfig;
use crate::error::{ConfigError, Result};

#[derive(Serialize)]
struct TokensBlock {
    tokens: TokenConfig,
}

/// Interactive Tesla login; prints the token block to paste into the config
pub async fn run() -> Result<()> {
    println!("{}", "Tesla account login".bold());

    let theme = ColorfulTheme::default();
    let user: String = Input::with_theme(&theme)
        .with_prompt("Email")
        .interact_text()?;
    let password = Password::with_theme(&theme)
        .with_prompt("Password")
        .interact()?;

    println!("\n{}", "Authenticating...".cyan());
    let mut identity = Identity::new(OAuthConfig::tesla())?.with_device_handler(PromptDevice);
    let tokens = identity.authenticate(&user, &password).await?;
    println!("{}", "✓ Login successful!".green());

    println!("\nAdd these tokens to the tesla vehicle in your config file:\n");
    print!("{}", tokens_yaml(&tokens)?);
    Ok(())
}

fn tokens_yaml(tokens: &TokenSet) -> Result<String> {
    let block = TokensBlock {
        tokens: TokenConfig::from(tokens),
    };
    Ok(serde_yaml::to_string(&block).map_err(ConfigError::from)?)
}
