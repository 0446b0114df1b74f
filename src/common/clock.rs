// src/common/clock.rs

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

// Horário de referência das clínicas (Argentina, UTC-3, sem horário de verão).
const REFERENCE_OFFSET_SECS: i32 = 3 * 3600;

pub const REFERENCE_TIMEZONE: &str = "America/Argentina/Buenos_Aires";

pub fn reference_offset() -> FixedOffset {
    FixedOffset::west_opt(REFERENCE_OFFSET_SECS).expect("offset UTC-3 é válido")
}

/// Fonte de "agora". Injetada para que disponibilidade e datas sejam testáveis.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Data/hora local da clínica, sem fuso.
    fn local_now(&self) -> NaiveDateTime {
        self.now().naive_local()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&reference_offset())
    }
}

/// Relógio parado, usado nos testes.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
            .and_local_timezone(reference_offset())
            .single()
            .expect("offset fixo nunca é ambíguo")
    }
}
