//! Configuration validation and conversion into dispatch settings.

use parley_framework::{CommandSyntax, DispatchSettings, Pattern};

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, ParleyConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ParleyConfig) -> ConfigResult<()> {
    dispatch_settings(&config.bot)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_logging(config: &ParleyConfig) -> ConfigResult<()> {
    use super::schema::LogOutput;

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output = \"file\"",
        ));
    }
    Ok(())
}

fn compile(field: &'static str, patterns: &[String]) -> ConfigResult<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::regex(pattern).map_err(|e| ConfigError::InvalidPattern {
                field,
                pattern: pattern.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Builds the dispatcher's settings from the `[bot]` section.
///
/// Literal markers come before patterns; the resolver picks the longest
/// match anyway.
pub fn dispatch_settings(bot: &BotConfig) -> ConfigResult<DispatchSettings> {
    if bot.session_expire_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "bot.session_expire_timeout_secs must be greater than 0",
        ));
    }
    if bot.command_start.is_empty() && bot.command_start_patterns.is_empty() {
        return Err(ConfigError::validation(
            "at least one command start marker is required",
        ));
    }

    let mut starts: Vec<Pattern> = bot.command_start.iter().map(Pattern::literal).collect();
    starts.extend(compile("bot.command_start_patterns", &bot.command_start_patterns)?);
    let mut separators: Vec<Pattern> = bot.command_sep.iter().map(Pattern::literal).collect();
    separators.extend(compile("bot.command_sep_patterns", &bot.command_sep_patterns)?);

    Ok(DispatchSettings {
        session_expire_timeout: bot.session_expire_timeout(),
        syntax: CommandSyntax {
            starts,
            separators,
        },
        default_validation_failure: bot.default_validation_failure.clone(),
    })
}
