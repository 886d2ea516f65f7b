use crate::bot::keyboards::inline_controls;
use reseller_core::composer::View;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use teloxide::RequestError;

pub async fn send_view(bot: &Bot, chat_id: ChatId, view: &View) -> Result<Message, RequestError> {
    let request = bot
        .send_message(chat_id, view.text.clone())
        .parse_mode(ParseMode::Html);
    if view.controls.is_empty() {
        request.await
    } else {
        request.reply_markup(inline_controls(&view.controls)).await
    }
}

pub async fn edit_view(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    view: &View,
) -> Result<Message, RequestError> {
    let request = bot
        .edit_message_text(chat_id, message_id, view.text.clone())
        .parse_mode(ParseMode::Html);
    if view.controls.is_empty() {
        request.await
    } else {
        request.reply_markup(inline_controls(&view.controls)).await
    }
}
