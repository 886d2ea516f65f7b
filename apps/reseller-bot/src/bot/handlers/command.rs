use crate::bot::keyboards::main_menu;
use crate::bot::screens;
use crate::bot::utils::send_view;
use crate::AppState;
use reseller_core::composer::View;
use reseller_core::format::escape_html;
use reseller_core::i18n::{Localizer, MessageKey, LANGUAGES};
use teloxide::prelude::*;
use teloxide::types::{BotCommand, ParseMode};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Start,
    Balance,
    Services,
    Currency,
    Language,
    Help,
    ReloadRates,
}

const MENU_BUTTONS: &[(MessageKey, MenuCommand)] = &[
    (MessageKey::MenuBalance, MenuCommand::Balance),
    (MessageKey::MenuServices, MenuCommand::Services),
    (MessageKey::MenuCurrency, MenuCommand::Currency),
    (MessageKey::MenuLanguage, MenuCommand::Language),
    (MessageKey::MenuHelp, MenuCommand::Help),
];

/// Commands advertised in Telegram's command menu. `/reload_rates` stays
/// unlisted since only admins may use it.
const PUBLIC_COMMANDS: &[(&str, &str)] = &[
    ("start", "Open the main menu"),
    ("balance", "Balance and recent transactions"),
    ("services", "Services and prices"),
    ("currency", "Choose display currency"),
    ("language", "Choose interface language"),
    ("help", "Help and support contact"),
];

pub fn bot_commands() -> Vec<BotCommand> {
    PUBLIC_COMMANDS
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description))
        .collect()
}

impl MenuCommand {
    /// Slash commands (`/balance`, `/balance@my_bot`) or a main-menu button
    /// label in any supported language.
    pub fn parse(text: &str, l10n: &dyn Localizer) -> Option<Self> {
        let text = text.trim();
        if let Some(command) = text.strip_prefix('/') {
            let name = command
                .split_whitespace()
                .next()
                .and_then(|c| c.split('@').next())
                .unwrap_or_default();
            return match name {
                "start" => Some(MenuCommand::Start),
                "balance" => Some(MenuCommand::Balance),
                "services" => Some(MenuCommand::Services),
                "currency" => Some(MenuCommand::Currency),
                "language" => Some(MenuCommand::Language),
                "help" => Some(MenuCommand::Help),
                "reload_rates" => Some(MenuCommand::ReloadRates),
                _ => None,
            };
        }

        MENU_BUTTONS
            .iter()
            .find(|(key, _)| {
                LANGUAGES
                    .iter()
                    .any(|(lang, _)| l10n.get_or_default(lang, *key, &[]) == text)
            })
            .map(|(_, command)| *command)
    }
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    info!("Received message: {:?}", text);

    let Some(command) = MenuCommand::parse(text, state.catalog.as_ref()) else {
        debug!("Ignoring non-command message from {}", from.id);
        return Ok(());
    };

    let tg_id = from.id.0 as i64;
    let pref = screens::preference(&state, tg_id).await;
    let language = pref.language_code.as_str();
    let catalog = state.catalog.as_ref();

    let view = match command {
        MenuCommand::Start => {
            let name = escape_html(&from.full_name());
            let welcome = catalog.get_or_default(language, MessageKey::Welcome, &[("name", name.as_str())]);
            if let Err(e) = bot
                .send_message(msg.chat.id, welcome)
                .parse_mode(ParseMode::Html)
                .reply_markup(main_menu(language, catalog))
                .await
            {
                error!("Failed to send welcome on /start: {}", e);
            }
            return Ok(());
        }
        MenuCommand::Balance => screens::balance(&state, &pref).await,
        MenuCommand::Services => screens::services(&state, &pref, 0).await,
        MenuCommand::Currency => screens::currency_menu(&state, &pref),
        MenuCommand::Language => screens::language_menu(&state, &pref),
        MenuCommand::Help => screens::help(&state, &pref),
        MenuCommand::ReloadRates => {
            if state.config.is_admin(tg_id) {
                let table = state.rates.reload(&state.accounts).await;
                let count = table.len().to_string();
                View::text_only(catalog.get_or_default(
                    language,
                    MessageKey::RatesReloaded,
                    &[("count", count.as_str())],
                ))
            } else {
                View::text_only(catalog.get_or_default(language, MessageKey::AdminOnly, &[]))
            }
        }
    };

    if let Err(e) = send_view(&bot, msg.chat.id, &view).await {
        error!("Failed to send {:?} view: {}", command, e);
    }
    Ok(())
}
