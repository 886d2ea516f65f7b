//! Loads account data for a user and hands it to the composer.
//!
//! Every collaborator failure ends here: it is logged and turned into the
//! localized error view, so handlers only ever deliver a `View`.

use crate::AppState;
use reseller_core::composer::{
    compose_add_funds_view, compose_balance_view, compose_currency_menu, compose_help_view,
    compose_language_menu, compose_services_view, error_view, BalanceInput, ServicesInput, View,
};
use reseller_core::i18n::{normalize_language, FALLBACK_LANGUAGE};
use reseller_core::models::UserPreference;
use reseller_core::store::AccountStore;
use tracing::{error, warn};

pub async fn preference(state: &AppState, user_id: i64) -> UserPreference {
    match state.accounts.get_preference(user_id).await {
        Ok(pref) => UserPreference {
            language_code: normalize_language(&pref.language_code),
            ..pref
        },
        Err(e) => {
            warn!("Using default preferences for {}: {}", user_id, e);
            UserPreference {
                user_id,
                currency_code: state.config.base_currency.clone(),
                language_code: FALLBACK_LANGUAGE.to_string(),
            }
        }
    }
}

pub async fn balance(state: &AppState, pref: &UserPreference) -> View {
    let language = pref.language_code.as_str();
    let limit = state.config.transactions_limit;

    let balance = match state.accounts.get_balance(pref.user_id).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to load balance for {}: {}", pref.user_id, e);
            return error_view(language, state.catalog.as_ref());
        }
    };
    let transactions = match state.accounts.get_transactions(pref.user_id, limit).await {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to load transactions for {}: {}", pref.user_id, e);
            return error_view(language, state.catalog.as_ref());
        }
    };
    let panel_balance = if state.config.is_admin(pref.user_id) {
        Some(state.upstream.balance().await)
    } else {
        None
    };

    let rates = state.rates.snapshot();
    compose_balance_view(
        &BalanceInput {
            balance,
            currency: &pref.currency_code,
            language,
            transactions: &transactions,
            limit,
            panel_balance: panel_balance.as_ref(),
        },
        &rates,
        state.catalog.as_ref(),
    )
}

pub async fn services(state: &AppState, pref: &UserPreference, page: usize) -> View {
    let language = pref.language_code.as_str();
    let services = match state.upstream.services().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load services: {}", e);
            return error_view(language, state.catalog.as_ref());
        }
    };

    let rates = state.rates.snapshot();
    compose_services_view(
        &ServicesInput {
            services: &services,
            page,
            page_size: state.config.services_page_size,
            currency: &pref.currency_code,
            language,
        },
        &state.config.markup,
        &rates,
        state.catalog.as_ref(),
    )
}

pub fn help(state: &AppState, pref: &UserPreference) -> View {
    compose_help_view(
        &pref.language_code,
        &state.config.support_contact,
        state.catalog.as_ref(),
    )
}

pub fn add_funds(state: &AppState, pref: &UserPreference) -> View {
    compose_add_funds_view(
        &pref.language_code,
        &state.config.support_contact,
        pref.user_id,
        state.catalog.as_ref(),
    )
}

pub fn currency_menu(state: &AppState, pref: &UserPreference) -> View {
    compose_currency_menu(
        &state.rates.snapshot(),
        &pref.currency_code,
        &pref.language_code,
        state.catalog.as_ref(),
    )
}

pub fn language_menu(state: &AppState, pref: &UserPreference) -> View {
    compose_language_menu(&pref.language_code, state.catalog.as_ref())
}
