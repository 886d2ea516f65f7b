//! Typed message catalog.
//!
//! Every user-facing string is a [`MessageKey`] with a built-in English
//! default. Texts can be overridden per language from a JSON file shaped as
//! `{ "ru": { "balance.title": "..." } }`.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{CoreError, Result};

pub const FALLBACK_LANGUAGE: &str = "en";

/// Languages offered in the language menu: (code, button label).
pub const LANGUAGES: &[(&str, &str)] = &[("en", "🇺🇸 English"), ("ru", "🇷🇺 Русский")];

/// Maps a Telegram language code (`en-US`, `RU`) onto a supported one.
pub fn normalize_language(code: &str) -> String {
    let primary = code
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if LANGUAGES.iter().any(|(c, _)| *c == primary) {
        primary
    } else {
        FALLBACK_LANGUAGE.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Welcome,
    GenericError,
    AdminOnly,
    MenuBalance,
    MenuServices,
    MenuCurrency,
    MenuLanguage,
    MenuHelp,
    BalanceTitle,
    BalanceLine,
    TransactionsTitle,
    NoTransactions,
    BalanceCallToAction,
    RefreshButton,
    AddFundsButton,
    AlreadyUpToDate,
    PanelBalance,
    ErrorFetching,
    AddFundsText,
    HelpText,
    ServicesTitle,
    ServicesEmpty,
    ServiceLimits,
    ServiceRefill,
    PrevPage,
    NextPage,
    CurrencyTitle,
    CurrencyChanged,
    CurrencyUnknown,
    LanguageTitle,
    LanguageChanged,
    RatesReloaded,
}

impl MessageKey {
    pub const ALL: &'static [MessageKey] = &[
        MessageKey::Welcome,
        MessageKey::GenericError,
        MessageKey::AdminOnly,
        MessageKey::MenuBalance,
        MessageKey::MenuServices,
        MessageKey::MenuCurrency,
        MessageKey::MenuLanguage,
        MessageKey::MenuHelp,
        MessageKey::BalanceTitle,
        MessageKey::BalanceLine,
        MessageKey::TransactionsTitle,
        MessageKey::NoTransactions,
        MessageKey::BalanceCallToAction,
        MessageKey::RefreshButton,
        MessageKey::AddFundsButton,
        MessageKey::AlreadyUpToDate,
        MessageKey::PanelBalance,
        MessageKey::ErrorFetching,
        MessageKey::AddFundsText,
        MessageKey::HelpText,
        MessageKey::ServicesTitle,
        MessageKey::ServicesEmpty,
        MessageKey::ServiceLimits,
        MessageKey::ServiceRefill,
        MessageKey::PrevPage,
        MessageKey::NextPage,
        MessageKey::CurrencyTitle,
        MessageKey::CurrencyChanged,
        MessageKey::CurrencyUnknown,
        MessageKey::LanguageTitle,
        MessageKey::LanguageChanged,
        MessageKey::RatesReloaded,
    ];

    /// (section, key, English, Russian)
    fn entry(self) -> (&'static str, &'static str, &'static str, &'static str) {
        use MessageKey::*;
        match self {
            Welcome => (
                "common",
                "welcome",
                "👋 <b>Hello, {name}!</b>\n\nUse the menu below to check your balance and browse services.",
                "👋 <b>Привет, {name}!</b>\n\nИспользуйте меню ниже, чтобы проверить баланс и посмотреть услуги.",
            ),
            GenericError => (
                "common",
                "error",
                "❌ Something went wrong. Please try again later.",
                "❌ Что-то пошло не так. Попробуйте позже.",
            ),
            AdminOnly => (
                "common",
                "admin_only",
                "🚫 This command is available to administrators only.",
                "🚫 Эта команда доступна только администраторам.",
            ),
            MenuBalance => ("menu", "balance", "💰 Balance", "💰 Баланс"),
            MenuServices => ("menu", "services", "🛍 Services", "🛍 Услуги"),
            MenuCurrency => ("menu", "currency", "💱 Currency", "💱 Валюта"),
            MenuLanguage => ("menu", "language", "🌐 Language", "🌐 Язык"),
            MenuHelp => ("menu", "help", "❓ Help", "❓ Помощь"),
            BalanceTitle => ("balance", "title", "💼 Your account", "💼 Ваш аккаунт"),
            BalanceLine => (
                "balance",
                "line",
                "💰 Balance: <b>{balance}</b>",
                "💰 Баланс: <b>{balance}</b>",
            ),
            TransactionsTitle => (
                "balance",
                "transactions",
                "🧾 Recent transactions:",
                "🧾 Последние операции:",
            ),
            NoTransactions => (
                "balance",
                "no_transactions",
                "🧾 No transactions yet.",
                "🧾 Операций пока нет.",
            ),
            BalanceCallToAction => (
                "balance",
                "cta",
                "Top up your balance to place new orders.",
                "Пополните баланс, чтобы оформлять новые заказы.",
            ),
            RefreshButton => ("balance", "refresh", "🔄 Refresh", "🔄 Обновить"),
            AddFundsButton => ("balance", "add_funds", "➕ Add funds", "➕ Пополнить"),
            AlreadyUpToDate => (
                "balance",
                "up_to_date",
                "✅ Already up to date",
                "✅ Данные актуальны",
            ),
            PanelBalance => (
                "balance",
                "panel",
                "🏦 Panel balance: {balance}",
                "🏦 Баланс панели: {balance}",
            ),
            ErrorFetching => ("balance", "error_fetching", "error fetching", "ошибка получения"),
            AddFundsText => (
                "funds",
                "instructions",
                "💳 <b>Add funds</b>\n\nTo top up your balance, contact {support} and mention your ID: <code>{user_id}</code>.",
                "💳 <b>Пополнение</b>\n\nЧтобы пополнить баланс, напишите {support} и укажите ваш ID: <code>{user_id}</code>.",
            ),
            HelpText => (
                "help",
                "text",
                "❓ <b>Help</b>\n\n/balance - balance and recent transactions\n/services - services and prices\n/currency - display currency\n/language - interface language\n/help - this message\n\nSupport: {support}",
                "❓ <b>Помощь</b>\n\n/balance - баланс и последние операции\n/services - услуги и цены\n/currency - валюта отображения\n/language - язык интерфейса\n/help - это сообщение\n\nПоддержка: {support}",
            ),
            ServicesTitle => (
                "services",
                "title",
                "🛍 <b>Services</b> ({page}/{pages}), prices per 1000",
                "🛍 <b>Услуги</b> ({page}/{pages}), цены за 1000",
            ),
            ServicesEmpty => (
                "services",
                "empty",
                "❌ No services available at the moment.",
                "❌ Сейчас нет доступных услуг.",
            ),
            ServiceLimits => ("services", "limits", "min {min} · max {max}", "мин {min} · макс {max}"),
            ServiceRefill => ("services", "refill", "♻️ refill", "♻️ докрутка"),
            PrevPage => ("services", "prev", "⬅️ Prev", "⬅️ Назад"),
            NextPage => ("services", "next", "Next ➡️", "Далее ➡️"),
            CurrencyTitle => (
                "currency",
                "title",
                "💱 Choose your display currency (current: <b>{currency}</b>)",
                "💱 Выберите валюту отображения (сейчас: <b>{currency}</b>)",
            ),
            CurrencyChanged => (
                "currency",
                "changed",
                "✅ Currency set to {currency}",
                "✅ Валюта изменена на {currency}",
            ),
            CurrencyUnknown => (
                "currency",
                "unknown",
                "❌ Currency {currency} is not available",
                "❌ Валюта {currency} недоступна",
            ),
            LanguageTitle => (
                "language",
                "title",
                "🌐 Choose your language",
                "🌐 Выберите язык",
            ),
            LanguageChanged => (
                "language",
                "changed",
                "✅ Language updated",
                "✅ Язык изменён",
            ),
            RatesReloaded => (
                "admin",
                "rates_reloaded",
                "♻️ Rates reloaded: {count} currencies",
                "♻️ Курсы обновлены: {count} валют",
            ),
        }
    }

    pub fn section(self) -> &'static str {
        self.entry().0
    }

    pub fn key(self) -> &'static str {
        self.entry().1
    }

    pub fn default_text(self) -> &'static str {
        self.entry().2
    }

    /// `section.key`, the form used in override files.
    pub fn path(self) -> String {
        format!("{}.{}", self.section(), self.key())
    }

    pub fn from_path(path: &str) -> Option<MessageKey> {
        let (section, key) = path.split_once('.')?;
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.section() == section && k.key() == key)
    }

    fn builtin_text(self, language: &str) -> Option<&'static str> {
        let (_, _, en, ru) = self.entry();
        match language {
            "en" => Some(en),
            "ru" => Some(ru),
            _ => None,
        }
    }
}

/// Substitutes `{name}` placeholders.
pub fn render(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in args {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}

pub trait Localizer: Send + Sync {
    /// Resolves `key` in `language`, then in [`FALLBACK_LANGUAGE`].
    fn get_message(&self, language: &str, key: MessageKey, args: &[(&str, &str)]) -> Result<String>;

    fn get_or_default(&self, language: &str, key: MessageKey, args: &[(&str, &str)]) -> String {
        self.get_message(language, key, args).unwrap_or_else(|e| {
            debug!("{}, using default text", e);
            render(key.default_text(), args)
        })
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    builtin: bool,
    overrides: HashMap<String, HashMap<MessageKey, String>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            builtin: true,
            overrides: HashMap::new(),
        }
    }

    /// A catalog with no built-in texts; only what is added explicitly.
    pub fn empty() -> Self {
        Self {
            builtin: false,
            overrides: HashMap::new(),
        }
    }

    pub fn with_text(mut self, language: &str, key: MessageKey, text: &str) -> Self {
        self.overrides
            .entry(language.to_string())
            .or_default()
            .insert(key, text.to_string());
        self
    }

    /// Layers overrides from a JSON document on top of this catalog.
    /// Unknown `section.key` paths are logged and skipped.
    pub fn merge_json(mut self, json: &str) -> serde_json::Result<Self> {
        let parsed: HashMap<String, HashMap<String, String>> = serde_json::from_str(json)?;
        for (language, texts) in parsed {
            for (path, text) in texts {
                match MessageKey::from_path(&path) {
                    Some(key) => {
                        self = self.with_text(&language, key, &text);
                    }
                    None => warn!("Unknown message key '{}' for language '{}'", path, language),
                }
            }
        }
        Ok(self)
    }

    fn lookup(&self, language: &str, key: MessageKey) -> Option<&str> {
        if let Some(text) = self.overrides.get(language).and_then(|t| t.get(&key)) {
            return Some(text.as_str());
        }
        if self.builtin {
            return key.builtin_text(language);
        }
        None
    }
}

impl Localizer for Catalog {
    fn get_message(&self, language: &str, key: MessageKey, args: &[(&str, &str)]) -> Result<String> {
        [language, FALLBACK_LANGUAGE]
            .into_iter()
            .find_map(|lang| self.lookup(lang, key))
            .map(|template| render(template, args))
            .ok_or_else(|| CoreError::MissingTranslation {
                language: language.to_string(),
                section: key.section(),
                key: key.key(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn paths_are_unique_and_resolvable() {
        let mut seen = HashSet::new();
        for key in MessageKey::ALL {
            assert!(seen.insert(key.path()), "duplicate path {}", key.path());
            assert_eq!(MessageKey::from_path(&key.path()), Some(*key));
        }
    }

    #[test]
    fn builtin_covers_every_language() {
        let catalog = Catalog::builtin();
        for (lang, _) in LANGUAGES {
            for key in MessageKey::ALL {
                assert!(catalog.get_message(lang, *key, &[]).is_ok());
            }
        }
    }

    #[test]
    fn placeholders_are_substituted() {
        let text = Catalog::builtin()
            .get_message("en", MessageKey::BalanceLine, &[("balance", "$1.00")])
            .unwrap();
        assert_eq!(text, "💰 Balance: <b>$1.00</b>");
    }

    #[test]
    fn unknown_language_uses_fallback() {
        let text = Catalog::builtin()
            .get_message("de", MessageKey::RefreshButton, &[])
            .unwrap();
        assert_eq!(text, "🔄 Refresh");
    }

    #[test]
    fn missing_everywhere_is_an_error() {
        let err = Catalog::empty()
            .get_message("ru", MessageKey::BalanceTitle, &[])
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::MissingTranslation {
                language: "ru".into(),
                section: "balance",
                key: "title",
            }
        );
        assert_eq!(
            Catalog::empty().get_or_default("ru", MessageKey::BalanceTitle, &[]),
            "💼 Your account"
        );
    }

    #[test]
    fn json_overrides_take_precedence() {
        let catalog = Catalog::builtin()
            .merge_json(r#"{"en": {"balance.title": "Wallet", "nope.key": "x"}}"#)
            .unwrap();
        assert_eq!(
            catalog.get_message("en", MessageKey::BalanceTitle, &[]).unwrap(),
            "Wallet"
        );
        assert_eq!(
            catalog.get_message("ru", MessageKey::BalanceTitle, &[]).unwrap(),
            "💼 Ваш аккаунт"
        );
    }

    #[test]
    fn telegram_language_codes_are_normalized() {
        assert_eq!(normalize_language("en-US"), "en");
        assert_eq!(normalize_language("RU"), "ru");
        assert_eq!(normalize_language("am"), "en");
        assert_eq!(normalize_language(""), "en");
    }
}
