// src/services/booking_tag.rs

use std::sync::LazyLock;

use regex::Regex;
use validator::Validate;

use crate::models::conversation::BookingIntent;

static CONFIRMATION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[\[CONFIRMADO:(.*?)\]\]").expect("regex da tag de confirmação é válida")
});

/// Resposta do modelo já separada em texto visível e pedido de agendamento.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub text: String,
    pub booking: Option<BookingIntent>,
}

/// Procura a tag `[[CONFIRMADO:{json}]]` na resposta.
///
/// A tag some do texto mesmo quando o JSON é inválido; nesse caso o turno
/// segue como resposta normal, sem agendamento.
pub fn parse_reply(reply: &str) -> ParsedReply {
    let Some(captures) = CONFIRMATION_TAG.captures(reply) else {
        return ParsedReply { text: reply.to_string(), booking: None };
    };

    let payload = captures.get(1).map_or("", |m| m.as_str()).trim();
    let booking = match serde_json::from_str::<BookingIntent>(payload) {
        Ok(intent) => match intent.validate() {
            Ok(()) => Some(intent),
            Err(e) => {
                tracing::warn!("Tag de confirmação incompleta, ignorando: {}", e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("⚠️ JSON inválido na tag de confirmação: {} ({})", e, payload);
            None
        }
    };

    let text = CONFIRMATION_TAG.replace_all(reply, "").trim().to_string();
    ParsedReply { text, booking }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reply_passes_through() {
        let parsed = parse_reply("¿Para qué día querés el turno?");
        assert_eq!(parsed.text, "¿Para qué día querés el turno?");
        assert!(parsed.booking.is_none());
    }

    #[test]
    fn tag_is_stripped_and_parsed() {
        let reply = "¡Excelente! 🐾 Cita agendada.\n\n[[CONFIRMADO:{\"pet_name\":\"Firulais\",\"reason\":\"control\",\"date_time\":\"2024-06-10 15:00\"}]]";
        let parsed = parse_reply(reply);

        assert_eq!(parsed.text, "¡Excelente! 🐾 Cita agendada.");
        let booking = parsed.booking.unwrap();
        assert_eq!(booking.pet_name, "Firulais");
        assert_eq!(booking.reason, "control");
        assert_eq!(booking.date_time, "2024-06-10 15:00");
    }

    #[test]
    fn tag_may_span_lines_and_sit_mid_text() {
        let reply = "Listo [[CONFIRMADO:{\n  \"pet_name\": \"Luna\",\n  \"date_time\": \"06-11 09:30\"\n}]] ¡Te esperamos!";
        let parsed = parse_reply(reply);

        assert_eq!(parsed.text, "Listo  ¡Te esperamos!");
        let booking = parsed.booking.unwrap();
        assert_eq!(booking.pet_name, "Luna");
        assert_eq!(booking.reason, "Consulta");
    }

    #[test]
    fn malformed_json_is_not_a_booking() {
        let parsed = parse_reply("Ok [[CONFIRMADO:{pet_name: Luna}]]");
        assert_eq!(parsed.text, "Ok");
        assert!(parsed.booking.is_none());
    }

    #[test]
    fn empty_pet_name_is_rejected() {
        let parsed = parse_reply("[[CONFIRMADO:{\"pet_name\":\"\",\"date_time\":\"2024-06-10 15:00\"}]]");
        assert!(parsed.booking.is_none());
        assert_eq!(parsed.text, "");
    }
}
