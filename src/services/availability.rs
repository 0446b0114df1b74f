// src/services/availability.rs

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::ClinicStore,
};

pub const SLOT_MINUTES: i64 = 30;
pub const DEFAULT_DAYS_AHEAD: u32 = 2;

pub(crate) const NO_AVAILABILITY: &str = "No hay horarios disponibles próximamente.";

pub(crate) const WEEKDAYS_ES: [&str; 7] =
    ["Lunes", "Martes", "Miércoles", "Jueves", "Viernes", "Sábado", "Domingo"];

pub(crate) fn weekday_es(day: Weekday) -> &'static str {
    WEEKDAYS_ES[day.num_days_from_monday() as usize]
}

/// Horário de funcionamento semanal. `None` = fechado.
pub fn business_hours(day: Weekday) -> Option<(NaiveTime, NaiveTime)> {
    let at = |h| NaiveTime::from_hms_opt(h, 0, 0);
    match day {
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri => {
            Some((at(9)?, at(18)?))
        }
        Weekday::Sat => Some((at(9)?, at(13)?)),
        Weekday::Sun => None,
    }
}

/// Percorre o dia em passos de 30 minutos, de abertura até fechamento.
///
/// Iterador preguiçoso e finito: pula horários já ocupados e, quando `day`
/// é hoje, tudo que não for estritamente posterior a `now`.
pub fn open_slots<'a>(
    day: NaiveDate,
    booked: &'a [NaiveTime],
    now: NaiveDateTime,
) -> impl Iterator<Item = NaiveTime> + 'a {
    let step = Duration::minutes(SLOT_MINUTES);
    let window = business_hours(day.weekday())
        .map(|(open, close)| (day.and_time(open), day.and_time(close)));

    let mut cursor = window.map(|(open, _)| open);
    let close = window.map(|(_, close)| close);
    let is_today = day == now.date();

    std::iter::from_fn(move || {
        let slot = cursor?;
        if slot + step > close? {
            return None;
        }
        cursor = Some(slot + step);
        Some(slot)
    })
    .filter(move |slot| !is_today || *slot > now)
    .map(|slot| slot.time())
    .filter(move |time| !booked.contains(time))
}

/// Resumo de vários dias para o prompt.
///
/// `days[0]` é hoje; hoje sem horário some do texto (já fechou), os demais
/// dias vazios aparecem como "Sin disponibilidad".
pub fn render_summary(days: &[(NaiveDate, Vec<String>)]) -> String {
    let mut lines = Vec::with_capacity(days.len());

    for (i, (day, slots)) in days.iter().enumerate() {
        let label = match i {
            0 => "Hoy",
            1 => "Mañana",
            _ => weekday_es(day.weekday()),
        };

        if slots.is_empty() {
            if i > 0 {
                lines.push(format!("- {}: Sin disponibilidad.", label));
            }
            continue;
        }

        let shown = if slots.len() > 6 {
            let mut abbreviated: Vec<&str> = slots[..4].iter().map(String::as_str).collect();
            abbreviated.push("...");
            abbreviated.extend(slots[slots.len() - 2..].iter().map(String::as_str));
            abbreviated.join(", ")
        } else {
            slots.join(", ")
        };

        lines.push(format!("- {} ({}): {}", label, day.format("%d/%m"), shown));
    }

    if lines.is_empty() {
        NO_AVAILABILITY.to_string()
    } else {
        lines.join("\n")
    }
}

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn ClinicStore>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn ClinicStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Horários livres (HH:MM) da clínica na data. Recalculado a cada chamada.
    pub async fn available_slots(
        &self,
        org_id: Uuid,
        day: NaiveDate,
    ) -> Result<Vec<String>, AppError> {
        if business_hours(day.weekday()).is_none() {
            return Ok(Vec::new());
        }

        let booked = self.store.confirmed_times(org_id, day).await?;
        let now = self.clock.local_now();

        Ok(open_slots(day, &booked, now)
            .map(|t| t.format("%H:%M").to_string())
            .collect())
    }

    /// Disponibilidade de hoje mais `days_ahead` dias, em texto.
    pub async fn formatted_availability(
        &self,
        org_id: Uuid,
        days_ahead: u32,
    ) -> Result<String, AppError> {
        let today = self.clock.local_now().date();
        let mut days = Vec::with_capacity(days_ahead as usize + 1);

        for offset in 0..=days_ahead {
            let day = today + Duration::days(offset.into());
            let slots = self.available_slots(org_id, day).await?;
            days.push((day, slots));
        }

        Ok(render_summary(&days))
    }
}
