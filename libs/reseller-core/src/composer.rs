//! Builds chat views (HTML text plus inline controls) from account data.
//!
//! Composition is pure: the same inputs always give byte-identical output,
//! which lets a refresh detect that nothing changed.

use rust_decimal::Decimal;
use tracing::warn;

use crate::error::Result;
use crate::format::{
    escape_html, format_balance, format_fixed, format_price_per_1000, format_signed_base_money,
    MONEY_DP,
};
use crate::i18n::{Localizer, MessageKey, LANGUAGES};
use crate::models::{Service, Transaction, TransactionKind, UpstreamBalance};
use crate::pricing::MarkupPolicy;
use crate::rates::{normalize_code, RateTable};

const GENERIC_ERROR_FALLBACK: &str = "Something went wrong. Please try again later.";
const CURRENCY_BUTTONS_PER_ROW: usize = 3;

/// What pressing a control asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    RefreshBalance,
    AddFunds,
    SetCurrency(String),
    SetLanguage(String),
    ServicesPage(usize),
}

impl Action {
    pub fn callback_data(&self) -> String {
        match self {
            Action::RefreshBalance => "refresh_balance".to_string(),
            Action::AddFunds => "add_funds".to_string(),
            Action::SetCurrency(code) => format!("set_cur_{}", code),
            Action::SetLanguage(code) => format!("set_lang_{}", code),
            Action::ServicesPage(page) => format!("services_page_{}", page),
        }
    }

    pub fn parse(data: &str) -> Option<Action> {
        match data {
            "refresh_balance" => Some(Action::RefreshBalance),
            "add_funds" => Some(Action::AddFunds),
            other => {
                if let Some(code) = other.strip_prefix("set_cur_") {
                    (!code.is_empty()).then(|| Action::SetCurrency(normalize_code(code)))
                } else if let Some(code) = other.strip_prefix("set_lang_") {
                    (!code.is_empty()).then(|| Action::SetLanguage(code.to_string()))
                } else if let Some(page) = other.strip_prefix("services_page_") {
                    page.parse().ok().map(Action::ServicesPage)
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub label: String,
    pub action: Action,
}

impl Control {
    fn new(label: String, action: Action) -> Self {
        Self { label, action }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub text: String,
    /// Rows of inline buttons.
    pub controls: Vec<Vec<Control>>,
}

impl View {
    pub fn text_only(text: String) -> Self {
        Self {
            text,
            controls: Vec::new(),
        }
    }
}

/// Generic localized error, with no controls.
pub fn error_view(language: &str, l10n: &dyn Localizer) -> View {
    let text = l10n
        .get_message(language, MessageKey::GenericError, &[])
        .unwrap_or_else(|e| {
            warn!("{}", e);
            GENERIC_ERROR_FALLBACK.to_string()
        });
    View::text_only(text)
}

fn caught(result: Result<View>, language: &str, l10n: &dyn Localizer) -> View {
    result.unwrap_or_else(|e| {
        warn!("Falling back to error view: {}", e);
        error_view(language, l10n)
    })
}

pub struct BalanceInput<'a> {
    pub balance: Decimal,
    pub currency: &'a str,
    pub language: &'a str,
    pub transactions: &'a [Transaction],
    /// Maximum transactions listed.
    pub limit: usize,
    /// Upstream panel balance, only present for admins.
    pub panel_balance: Option<&'a Result<UpstreamBalance>>,
}

pub fn compose_balance_view(input: &BalanceInput<'_>, rates: &RateTable, l10n: &dyn Localizer) -> View {
    caught(try_balance_view(input, rates, l10n), input.language, l10n)
}

fn try_balance_view(input: &BalanceInput<'_>, rates: &RateTable, l10n: &dyn Localizer) -> Result<View> {
    let lang = input.language;
    let mut text = format!("<b>{}</b>\n\n", l10n.get_message(lang, MessageKey::BalanceTitle, &[])?);

    let balance = format_balance(input.balance, input.currency, rates);
    text.push_str(&l10n.get_message(lang, MessageKey::BalanceLine, &[("balance", balance.as_str())])?);
    text.push('\n');

    if let Some(panel) = input.panel_balance {
        text.push_str(&panel_balance_line(panel, lang, l10n)?);
        text.push('\n');
    }
    text.push('\n');

    if input.transactions.is_empty() {
        text.push_str(&l10n.get_message(lang, MessageKey::NoTransactions, &[])?);
        text.push('\n');
    } else {
        let mut recent: Vec<&Transaction> = input.transactions.iter().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        text.push_str(&l10n.get_message(lang, MessageKey::TransactionsTitle, &[])?);
        text.push('\n');
        for tx in recent.into_iter().take(input.limit) {
            text.push_str(&transaction_line(tx, rates)?);
            text.push('\n');
        }
    }

    text.push('\n');
    text.push_str(&l10n.get_message(lang, MessageKey::BalanceCallToAction, &[])?);

    let controls = vec![vec![
        Control::new(
            l10n.get_message(lang, MessageKey::RefreshButton, &[])?,
            Action::RefreshBalance,
        ),
        Control::new(
            l10n.get_message(lang, MessageKey::AddFundsButton, &[])?,
            Action::AddFunds,
        ),
    ]];

    Ok(View { text, controls })
}

fn transaction_line(tx: &Transaction, rates: &RateTable) -> Result<String> {
    tx.validate()?;
    let glyph = match tx.kind {
        TransactionKind::Credit => "➕",
        TransactionKind::Debit => "➖",
    };
    Ok(format!(
        "{} <b>{}</b> · {} · <i>{}</i>",
        glyph,
        format_signed_base_money(tx.amount, rates),
        escape_html(&tx.description),
        tx.date()?
    ))
}

/// Admin-only line with the upstream panel balance. An unavailable upstream
/// shows the localized "error fetching" label in place of the amount.
pub fn panel_balance_line(
    panel: &Result<UpstreamBalance>,
    language: &str,
    l10n: &dyn Localizer,
) -> Result<String> {
    let amount = match panel {
        Ok(b) => format!(
            "{} {}",
            format_fixed(b.balance, MONEY_DP),
            escape_html(&b.currency)
        ),
        Err(e) => {
            warn!("Panel balance unavailable: {}", e);
            l10n.get_message(language, MessageKey::ErrorFetching, &[])?
        }
    };
    l10n.get_message(language, MessageKey::PanelBalance, &[("balance", amount.as_str())])
}

pub fn compose_help_view(language: &str, support: &str, l10n: &dyn Localizer) -> View {
    let support = escape_html(support);
    caught(
        l10n.get_message(language, MessageKey::HelpText, &[("support", support.as_str())])
            .map(View::text_only),
        language,
        l10n,
    )
}

pub fn compose_add_funds_view(language: &str, support: &str, user_id: i64, l10n: &dyn Localizer) -> View {
    let support = escape_html(support);
    let user_id = user_id.to_string();
    caught(
        l10n.get_message(
            language,
            MessageKey::AddFundsText,
            &[("support", support.as_str()), ("user_id", user_id.as_str())],
        )
        .map(View::text_only),
        language,
        l10n,
    )
}

pub struct ServicesInput<'a> {
    pub services: &'a [Service],
    /// Zero-based; clamped to the last page.
    pub page: usize,
    pub page_size: usize,
    pub currency: &'a str,
    pub language: &'a str,
}

pub fn compose_services_view(
    input: &ServicesInput<'_>,
    policy: &MarkupPolicy,
    rates: &RateTable,
    l10n: &dyn Localizer,
) -> View {
    caught(try_services_view(input, policy, rates, l10n), input.language, l10n)
}

fn try_services_view(
    input: &ServicesInput<'_>,
    policy: &MarkupPolicy,
    rates: &RateTable,
    l10n: &dyn Localizer,
) -> Result<View> {
    let lang = input.language;
    if input.services.is_empty() {
        return l10n
            .get_message(lang, MessageKey::ServicesEmpty, &[])
            .map(View::text_only);
    }

    let page_size = input.page_size.max(1);
    let pages = input.services.len().div_ceil(page_size);
    let page = input.page.min(pages - 1);
    let (page_label, pages_label) = ((page + 1).to_string(), pages.to_string());

    let mut text = l10n.get_message(
        lang,
        MessageKey::ServicesTitle,
        &[("page", page_label.as_str()), ("pages", pages_label.as_str())],
    )?;
    text.push('\n');

    let refill = l10n.get_message(lang, MessageKey::ServiceRefill, &[])?;
    let mut category: Option<&str> = None;
    for service in input.services.iter().skip(page * page_size).take(page_size) {
        let displayed = match policy.display_price(service.base_rate, service.skip_markup) {
            Ok(price) => price,
            Err(e) => {
                warn!("Leaving service {} out of the price list: {}", service.id, e);
                continue;
            }
        };
        if category != Some(service.category.as_str()) {
            text.push_str(&format!("\n<u>{}</u>\n", escape_html(&service.category)));
            category = Some(service.category.as_str());
        }
        let (min, max) = (service.min.to_string(), service.max.to_string());
        let limits = l10n.get_message(
            lang,
            MessageKey::ServiceLimits,
            &[("min", min.as_str()), ("max", max.as_str())],
        )?;
        text.push_str(&format!(
            "<b>#{}</b> {}\n    💵 {} · {}",
            service.id,
            escape_html(&service.name),
            format_price_per_1000(displayed, input.currency, rates),
            limits
        ));
        if service.refill {
            text.push_str(" · ");
            text.push_str(&refill);
        }
        text.push('\n');
    }

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(Control::new(
            l10n.get_message(lang, MessageKey::PrevPage, &[])?,
            Action::ServicesPage(page - 1),
        ));
    }
    if page + 1 < pages {
        nav.push(Control::new(
            l10n.get_message(lang, MessageKey::NextPage, &[])?,
            Action::ServicesPage(page + 1),
        ));
    }
    let controls = if nav.is_empty() { Vec::new() } else { vec![nav] };

    Ok(View { text, controls })
}

pub fn compose_currency_menu(rates: &RateTable, current: &str, language: &str, l10n: &dyn Localizer) -> View {
    let current = normalize_code(current);
    let shown = escape_html(&current);
    let result = l10n
        .get_message(language, MessageKey::CurrencyTitle, &[("currency", shown.as_str())])
        .map(|text| {
            let controls: Vec<Vec<Control>> = rates
                .currencies()
                .chunks(CURRENCY_BUTTONS_PER_ROW)
                .map(|row| {
                    row.iter()
                        .map(|code| {
                            let label = if *code == current {
                                format!("✅ {}", code)
                            } else {
                                code.to_string()
                            };
                            Control::new(label, Action::SetCurrency(code.to_string()))
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
            View { text, controls }
        });
    caught(result, language, l10n)
}

pub fn compose_language_menu(language: &str, l10n: &dyn Localizer) -> View {
    let result = l10n
        .get_message(language, MessageKey::LanguageTitle, &[])
        .map(|text| View {
            text,
            controls: vec![LANGUAGES
                .iter()
                .map(|(code, label)| {
                    Control::new(label.to_string(), Action::SetLanguage(code.to_string()))
                })
                .collect::<Vec<_>>()],
        });
    caught(result, language, l10n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::i18n::Catalog;
    use crate::rates::default_rates;
    use rust_decimal_macros::dec;

    fn rates() -> RateTable {
        RateTable::new("USD", default_rates())
    }

    fn tx(amount: Decimal, kind: TransactionKind, desc: &str, at: &str) -> Transaction {
        Transaction {
            amount,
            kind,
            description: desc.into(),
            created_at: at.into(),
        }
    }

    fn history() -> Vec<Transaction> {
        vec![
            tx(dec!(10), TransactionKind::Credit, "Top-up", "2024-04-01T09:00:00Z"),
            tx(dec!(-2.5), TransactionKind::Debit, "Order <#51>", "2024-04-03T18:30:00Z"),
            tx(dec!(-1), TransactionKind::Debit, "Order #49", "2024-04-02T08:00:00Z"),
        ]
    }

    fn balance_input<'a>(transactions: &'a [Transaction], currency: &'a str) -> BalanceInput<'a> {
        BalanceInput {
            balance: dec!(10.0),
            currency,
            language: "en",
            transactions,
            limit: 5,
            panel_balance: None,
        }
    }

    #[test]
    fn action_callback_data_round_trips() {
        for action in [
            Action::RefreshBalance,
            Action::AddFunds,
            Action::SetCurrency("ETB".into()),
            Action::SetLanguage("ru".into()),
            Action::ServicesPage(3),
        ] {
            assert_eq!(Action::parse(&action.callback_data()), Some(action));
        }
        assert_eq!(Action::parse("set_cur_"), None);
        assert_eq!(Action::parse("services_page_x"), None);
        assert_eq!(Action::parse("buy_dur_1"), None);
    }

    #[test]
    fn balance_view_lists_newest_first() {
        let txs = history();
        let view = compose_balance_view(&balance_input(&txs, "ETB"), &rates(), &Catalog::builtin());

        assert!(view.text.contains("💰 Balance: <b>ETB 1,585 (≈$10.00)</b>"));
        let newest = view.text.find("2024-04-03").unwrap();
        let middle = view.text.find("2024-04-02").unwrap();
        let oldest = view.text.find("2024-04-01").unwrap();
        assert!(newest < middle && middle < oldest);
        assert!(view.text.contains("➖ <b>-$2.50</b> · Order &lt;#51&gt; · <i>2024-04-03</i>"));
        assert!(view.text.contains("➕ <b>+$10.00</b> · Top-up · <i>2024-04-01</i>"));
        assert!(!view.text.contains("T18:30"));
    }

    #[test]
    fn balance_view_respects_limit() {
        let txs = history();
        let mut input = balance_input(&txs, "USD");
        input.limit = 1;
        let view = compose_balance_view(&input, &rates(), &Catalog::builtin());
        assert!(view.text.contains("2024-04-03"));
        assert!(!view.text.contains("2024-04-02"));
        assert!(!view.text.contains("2024-04-01"));
    }

    #[test]
    fn balance_view_always_has_refresh_and_add_funds() {
        let view = compose_balance_view(&balance_input(&[], "USD"), &rates(), &Catalog::builtin());
        let actions: Vec<&Action> = view.controls.iter().flatten().map(|c| &c.action).collect();
        assert_eq!(actions, vec![&Action::RefreshBalance, &Action::AddFunds]);
    }

    #[test]
    fn empty_history_shows_no_transactions_line() {
        let view = compose_balance_view(&balance_input(&[], "USD"), &rates(), &Catalog::builtin());
        assert!(view.text.contains("🧾 No transactions yet."));
        assert!(!view.text.contains("Recent transactions"));
    }

    #[test]
    fn composing_twice_is_identical() {
        let txs = history();
        let input = balance_input(&txs, "ETB");
        let catalog = Catalog::builtin();
        assert_eq!(
            compose_balance_view(&input, &rates(), &catalog),
            compose_balance_view(&input, &rates(), &catalog)
        );
    }

    #[test]
    fn malformed_transaction_yields_error_view_only() {
        let txs = vec![tx(dec!(3), TransactionKind::Credit, "bad", "03/04")];
        let view = compose_balance_view(&balance_input(&txs, "USD"), &rates(), &Catalog::builtin());
        assert_eq!(view.text, "❌ Something went wrong. Please try again later.");
        assert!(view.controls.is_empty());
    }

    #[test]
    fn missing_translation_yields_localized_error() {
        let catalog = Catalog::empty().with_text("ru", MessageKey::GenericError, "Ошибка");
        let mut input = balance_input(&[], "USD");
        input.language = "ru";
        let view = compose_balance_view(&input, &rates(), &catalog);
        assert_eq!(view.text, "Ошибка");
        assert!(view.controls.is_empty());
    }

    #[test]
    fn missing_error_text_uses_fixed_sentence() {
        let view = compose_balance_view(&balance_input(&[], "USD"), &rates(), &Catalog::empty());
        assert_eq!(view.text, GENERIC_ERROR_FALLBACK);
    }

    #[test]
    fn panel_balance_degrades_inline() {
        let down: Result<UpstreamBalance> = Err(CoreError::UpstreamUnavailable("timeout".into()));
        let mut input = balance_input(&[], "USD");
        input.panel_balance = Some(&down);
        let view = compose_balance_view(&input, &rates(), &Catalog::builtin());
        assert!(view.text.contains("🏦 Panel balance: error fetching"));
        assert_eq!(view.controls[0].len(), 2);

        let up: Result<UpstreamBalance> = Ok(UpstreamBalance {
            balance: dec!(100.845),
            currency: "USD".into(),
        });
        input.panel_balance = Some(&up);
        let view = compose_balance_view(&input, &rates(), &Catalog::builtin());
        assert!(view.text.contains("🏦 Panel balance: 100.85 USD"));
    }

    fn services() -> Vec<Service> {
        (1..=5)
            .map(|id| Service {
                id,
                name: format!("Service {}", id),
                category: if id < 4 { "Instagram".into() } else { "YouTube".into() },
                base_rate: dec!(0.99),
                min: 100,
                max: 10000,
                refill: id == 2,
                skip_markup: id == 3,
            })
            .collect()
    }

    #[test]
    fn services_view_prices_with_markup() {
        let list = services();
        let input = ServicesInput {
            services: &list,
            page: 0,
            page_size: 3,
            currency: "USD",
            language: "en",
        };
        let view = compose_services_view(&input, &MarkupPolicy::default(), &rates(), &Catalog::builtin());

        assert!(view.text.contains("(1/2)"));
        assert!(view.text.contains("<u>Instagram</u>"));
        assert!(view.text.contains("<b>#1</b> Service 1\n    💵 $1.980000 · min 100 · max 10000\n"));
        assert!(view.text.contains("💵 $0.990000"));
        assert!(view.text.contains("♻️ refill"));
        assert!(!view.text.contains("Service 4"));
        assert_eq!(view.controls, vec![vec![Control::new("Next ➡️".into(), Action::ServicesPage(1))]]);
    }

    #[test]
    fn services_view_clamps_page_and_converts() {
        let list = services();
        let input = ServicesInput {
            services: &list,
            page: 9,
            page_size: 3,
            currency: "ETB",
            language: "en",
        };
        let view = compose_services_view(&input, &MarkupPolicy::default(), &rates(), &Catalog::builtin());
        assert!(view.text.contains("(2/2)"));
        assert!(view.text.contains("<u>YouTube</u>"));
        assert!(view.text.contains("ETB 314 (≈$1.98)"));
        assert_eq!(view.controls[0][0].action, Action::ServicesPage(0));
    }

    #[test]
    fn empty_services_list() {
        let input = ServicesInput {
            services: &[],
            page: 0,
            page_size: 10,
            currency: "USD",
            language: "en",
        };
        let view = compose_services_view(&input, &MarkupPolicy::default(), &rates(), &Catalog::builtin());
        assert_eq!(view.text, "❌ No services available at the moment.");
        assert!(view.controls.is_empty());
    }

    #[test]
    fn currency_menu_marks_current() {
        let view = compose_currency_menu(&rates(), "etb", "en", &Catalog::builtin());
        assert!(view.text.contains("<b>ETB</b>"));
        let labels: Vec<&str> = view.controls.iter().flatten().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["USD", "✅ ETB"]);
    }

    #[test]
    fn language_menu_offers_all_languages() {
        let view = compose_language_menu("ru", &Catalog::builtin());
        assert_eq!(view.text, "🌐 Выберите язык");
        assert_eq!(view.controls[0].len(), LANGUAGES.len());
    }

    #[test]
    fn help_and_funds_escape_support_contact() {
        let catalog = Catalog::builtin();
        let help = compose_help_view("en", "@shop_support", &catalog);
        assert!(help.text.ends_with("Support: @shop_support"));
        let funds = compose_add_funds_view("en", "<admin>", 42, &catalog);
        assert!(funds.text.contains("&lt;admin&gt;"));
        assert!(funds.text.contains("<code>42</code>"));
    }

    #[test]
    fn oversized_rates_never_abort_composition() {
        let mut list = services();
        list[0].base_rate = Decimal::MAX;
        let input = ServicesInput {
            services: &list,
            page: 0,
            page_size: 3,
            currency: "USD",
            language: "en",
        };
        let view = compose_services_view(&input, &MarkupPolicy::default(), &rates(), &Catalog::builtin());
        assert!(!view.text.contains("Service 1\n"));
        assert!(view.text.contains("<b>#2</b> Service 2"));

        let huge_etb = Decimal::from_i128_with_scale(10i128.pow(20), 0);
        let table = RateTable::new("USD", [("ETB".to_string(), huge_etb)]);
        let mut input = balance_input(&[], "ETB");
        input.balance = dec!(1000000000000);
        let view = compose_balance_view(&input, &table, &Catalog::builtin());
        assert!(view.text.contains("💰 Balance: <b>$1,000,000,000,000.00</b>"));
        assert_eq!(view.controls[0].len(), 2);
    }

    #[test]
    fn currency_menu_escapes_stored_code() {
        let view = compose_currency_menu(&rates(), "<i>x", "en", &Catalog::builtin());
        assert!(view.text.contains("<b>&lt;I&gt;X</b>"));
    }
}
