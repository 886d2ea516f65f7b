use reseller_core::composer::Control;
use reseller_core::i18n::{Localizer, MessageKey};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

pub fn main_menu(language: &str, l10n: &dyn Localizer) -> KeyboardMarkup {
    let button = |key| KeyboardButton::new(l10n.get_or_default(language, key, &[]));
    KeyboardMarkup::new(vec![
        vec![button(MessageKey::MenuBalance), button(MessageKey::MenuServices)],
        vec![button(MessageKey::MenuCurrency), button(MessageKey::MenuLanguage)],
        vec![button(MessageKey::MenuHelp)],
    ])
    .resize_keyboard()
}

pub fn inline_controls(controls: &[Vec<Control>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(controls.iter().map(|row| {
        row.iter()
            .map(|c| InlineKeyboardButton::callback(c.label.clone(), c.action.callback_data()))
            .collect::<Vec<_>>()
    }))
}
