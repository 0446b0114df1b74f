// src/services/prompts.rs
//
// Textos fixos do assistente e montagem do prompt de sistema.

use chrono::{Datelike, NaiveDate};

use crate::{
    models::clinic::{ServiceItem, Vaccination},
    services::availability::weekday_es,
};

const CLINIC_NAME_PLACEHOLDER: &str = "[CLINICA_NOMBRE]";

const PERSONA: &str = r#"Eres DogBot, el asistente virtual experto de la clínica veterinaria [CLINICA_NOMBRE].
Tu misión es ayudar a los dueños de mascotas de forma empática, rápida y profesional. 🐾

### **REGLAS DE ORO**
1. **Identidad:** Siempre refiérete a la clínica como "[CLINICA_NOMBRE]". No inventes ni mezcles nombres.
2. **Empatía:** Usa emojis y un tono amable.
3. **Brevedad:** No escribas párrafos largos.
4. **No Repetición:** Evita saludar de nuevo si ya te has saludado.

### **FASE 1: TRIAJE Y MENÚ**
Si el usuario saluda o está perdido:
"¡Hola! 🐾 Bienvenido a [CLINICA_NOMBRE]. Soy tu asistente virtual.
¿En qué puedo ayudarte hoy?"
1. 📅 **Agendar Cita** (Usa los horarios disponibles abajo)
2. 💰 **Precios** (Usa el LISTADO DE PRECIOS proporcionado en el contexto)
3. 🩺 **Plan de Vacunación**
4. 💊 **Pedidos**

### **REGLA DE PRECIOS:**
- Cuando el usuario pregunte por el costo de un servicio, consulta SIEMPRE el "LISTADO DE PRECIOS" que te envío en el contexto.
- Responde de forma clara el precio exacto.
- Si un servicio NO aparece en el listado, responde: "Por el momento no tengo el precio exacto de ese servicio en mi sistema, pero puedo consultarlo con el equipo veterinario por ti. ¿Te gustaría?"

### **FASE 2: AGENDAMIENTO INTELIGENTE**
Cuando el usuario quiera agendar:
1. Pide nombre de la mascota y motivo.
2. **IMPORTANTE:** Revisa los "HORARIOS DISPONIBLES" que te proporciono en el contexto y sugiérelos proactivamente.
   - No sugieras horarios que NO estén en la lista.
   - Si no hay disponibilidad para un día, ofrece el siguiente día con huecos.

### **FASE 3: TICKET DE CONFIRMACIÓN (OBLIGATORIO)**
Cuando el usuario confirme:
"¡Excelente! 🐾 Cita agendada para [CLINICA_NOMBRE]. Aquí tienes tu comprobante:

🎫 **TICKET DE CITA**
━━━━━━━━━━━━━━
🐶 **Mascota:** [Nombre]
💊 **Motivo:** [Motivo]
📅 **Fecha:** [Fecha y Hora]
📍 **Lugar:** [CLINICA_NOMBRE]
━━━━━━━━━━━━━━
¡Te esperamos! ✅

[[CONFIRMADO:{"pet_name": "Nombre", "reason": "Motivo", "date_time": "YYYY-MM-DD HH:MM"}]]""#;

pub const VOICE_UPSELL: &str = "🐾 Tu plan actual no incluye mensajes de voz.";
pub const IMAGE_UPSELL: &str = "🐾 Tu plan actual no incluye análisis de imágenes.";

pub const CHAT_FALLBACK: &str =
    "Lo siento, tengo un problema técnico. ¿Podrías repetir o llamar a la clínica? 🐾";
pub const VISION_FALLBACK: &str =
    "No pude analizar la imagen correctamente. ¿Podrías describirme lo que ves? 🐾";

pub const VISION_PROMPT: &str = "Esta es una imagen enviada por un cliente a una veterinaria. Describe qué ves (heridas, síntomas, mascota).";

const GREETINGS: [&str; 8] = [
    "hola",
    "buen día",
    "buenas tardes",
    "buenas noches",
    "inicio",
    "comenzar",
    "menu",
    "menú",
];

const MONTHS_ES: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio",
    "Julio", "Agosto", "Septiembre", "Octubre", "Noviembre", "Diciembre",
];

pub fn is_greeting(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    GREETINGS.contains(&normalized.as_str())
}

pub fn welcome_menu(clinic_name: &str) -> String {
    format!(
        "¡Hola! 🐾 Bienvenido a {}. Soy tu asistente virtual.\n\
         ¿En qué puedo ayudarte hoy?\n\n\
         1. 📅 *Agendar Cita*\n\
         2. 💰 *Precios*\n\
         3. 🩺 *Plan de Vacunación*\n\
         4. 💊 *Pedidos*",
        clinic_name
    )
}

/// "Lunes, 10 de Junio de 2024"
pub fn spanish_date(day: NaiveDate) -> String {
    format!(
        "{}, {} de {} de {}",
        weekday_es(day.weekday()),
        day.day(),
        MONTHS_ES[day.month0() as usize],
        day.year()
    )
}

pub fn services_text(services: &[ServiceItem]) -> String {
    let mut text = String::from("LISTADO DE PRECIOS Y SERVICIOS:\n");
    if services.is_empty() {
        text.push_str("(Consulte precios en recepción)\n");
        return text;
    }

    for service in services {
        text.push_str(&format!(
            "- {}: ${:.2} ({})\n",
            service.name,
            service.price.round_dp(2),
            service.category
        ));
    }
    text
}

/// Resumo das vacinas; vazio quando não há nenhuma.
pub fn vaccine_digest(pet_name: &str, vaccinations: &[Vaccination]) -> String {
    if vaccinations.is_empty() {
        return String::new();
    }

    let lines: Vec<String> = vaccinations
        .iter()
        .map(|v| format!("- {}: {}", v.vaccine_name, v.date_administered.format("%d/%m/%Y")))
        .collect();

    format!("\nHISTORIAL DE VACUNAS para {}:\n{}", pet_name, lines.join("\n"))
}

pub struct PromptContext<'a> {
    pub clinic_name: &'a str,
    pub today: NaiveDate,
    pub availability: &'a str,
    pub services: &'a str,
    pub vaccines: &'a str,
}

pub fn system_instruction(ctx: &PromptContext<'_>) -> String {
    let persona = PERSONA.replace(CLINIC_NAME_PLACEHOLDER, ctx.clinic_name);
    format!(
        "{}\n\n\
         IDENTIDAD ACTUAL: Estás atendiendo para la clínica '{}'.\n\
         FECHA ACTUAL: Hoy es {}.\n\
         HORARIOS DISPONIBLES:\n{}\n\
         {}\n\
         {}",
        persona,
        ctx.clinic_name,
        spanish_date(ctx.today),
        ctx.availability,
        ctx.services,
        ctx.vaccines
    )
}
