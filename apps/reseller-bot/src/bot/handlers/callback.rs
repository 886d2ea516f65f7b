use crate::bot::keyboards::main_menu;
use crate::bot::screens;
use crate::bot::utils::{edit_view, send_view};
use crate::AppState;
use reseller_core::composer::{Action, View};
use reseller_core::i18n::{normalize_language, Localizer, MessageKey};
use reseller_core::store::AccountStore;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::{error, info, warn};

/// Outcome of replacing a message in place.
#[derive(Debug, PartialEq, Eq)]
enum Refresh {
    Updated,
    Unchanged,
    Failed,
}

impl Refresh {
    /// Telegram rejects an edit whose text and markup match the current
    /// message; the composer is deterministic, so that means nothing changed.
    fn from_edit<T>(result: &Result<T, RequestError>) -> Self {
        match result {
            Ok(_) => Refresh::Updated,
            Err(RequestError::Api(ApiError::MessageNotModified)) => Refresh::Unchanged,
            Err(_) => Refresh::Failed,
        }
    }
}

async fn replace(bot: &Bot, target: Option<(ChatId, MessageId)>, view: &View) -> Refresh {
    let Some((chat_id, message_id)) = target else {
        return Refresh::Failed;
    };
    let result = edit_view(bot, chat_id, message_id, view).await;
    let outcome = Refresh::from_edit(&result);
    if let Err(e) = result {
        if matches!(outcome, Refresh::Failed) {
            error!("Failed to edit message {:?}: {}", message_id, e);
            // Too old to edit; send a fresh message instead.
            if let Err(e) = send_view(bot, chat_id, view).await {
                error!("Failed to send replacement view: {}", e);
            }
        }
    }
    outcome
}

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    info!("Received callback: {:?}", q.data);
    let callback_id = q.id.clone();
    let tg_id = q.from.id.0 as i64;
    let target = q.message.as_ref().map(|m| (m.chat().id, m.id()));

    let Some(action) = q.data.as_deref().and_then(Action::parse) else {
        warn!("Unknown callback data from {}: {:?}", tg_id, q.data);
        let _ = bot.answer_callback_query(callback_id).await;
        return Ok(());
    };

    let pref = screens::preference(&state, tg_id).await;
    let catalog = state.catalog.as_ref();

    match action {
        Action::RefreshBalance => {
            let view = screens::balance(&state, &pref).await;
            match replace(&bot, target, &view).await {
                Refresh::Unchanged => {
                    let text = catalog.get_or_default(&pref.language_code, MessageKey::AlreadyUpToDate, &[]);
                    let _ = bot.answer_callback_query(callback_id).text(text).await;
                }
                Refresh::Updated | Refresh::Failed => {
                    let _ = bot.answer_callback_query(callback_id).await;
                }
            }
        }

        Action::AddFunds => {
            let _ = bot.answer_callback_query(callback_id).await;
            if let Some((chat_id, _)) = target {
                let view = screens::add_funds(&state, &pref);
                if let Err(e) = send_view(&bot, chat_id, &view).await {
                    error!("Failed to send add funds view: {}", e);
                }
            }
        }

        Action::SetCurrency(code) => {
            let language = pref.language_code.as_str();
            let rates = state.rates.snapshot();
            if rates.rate(&code).is_err() {
                let text = catalog.get_or_default(
                    language,
                    MessageKey::CurrencyUnknown,
                    &[("currency", code.as_str())],
                );
                let _ = bot
                    .answer_callback_query(callback_id)
                    .text(text)
                    .show_alert(true)
                    .await;
                return Ok(());
            }

            if let Err(e) = state.accounts.set_currency_preference(tg_id, &code).await {
                error!("Failed to store currency {} for {}: {}", code, tg_id, e);
                let text = catalog.get_or_default(language, MessageKey::GenericError, &[]);
                let _ = bot.answer_callback_query(callback_id).text(text).await;
                return Ok(());
            }

            let text = catalog.get_or_default(
                language,
                MessageKey::CurrencyChanged,
                &[("currency", code.as_str())],
            );
            let _ = bot.answer_callback_query(callback_id).text(text).await;

            let pref = reseller_core::models::UserPreference {
                currency_code: code,
                ..pref
            };
            let view = screens::balance(&state, &pref).await;
            replace(&bot, target, &view).await;
        }

        Action::SetLanguage(code) => {
            let language = normalize_language(&code);
            if let Err(e) = state.accounts.set_language(tg_id, &language).await {
                error!("Failed to store language {} for {}: {}", language, tg_id, e);
                let text = catalog.get_or_default(&pref.language_code, MessageKey::GenericError, &[]);
                let _ = bot.answer_callback_query(callback_id).text(text).await;
                return Ok(());
            }
            let _ = bot.answer_callback_query(callback_id).await;

            if let Some((chat_id, message_id)) = target {
                let _ = bot.delete_message(chat_id, message_id).await;
                let text = catalog.get_or_default(&language, MessageKey::LanguageChanged, &[]);
                let _ = bot
                    .send_message(chat_id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(main_menu(&language, catalog))
                    .await
                    .map_err(|e| error!("Failed to confirm language change: {}", e));
            }
        }

        Action::ServicesPage(page) => {
            let _ = bot.answer_callback_query(callback_id).await;
            let view = screens::services(&state, &pref, page).await;
            replace(&bot, target, &view).await;
        }
    }

    Ok(())
}
