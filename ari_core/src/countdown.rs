//! Dose countdown.
//!
//! The next dose of a prescription is due `frequencia` hours after its
//! `dataInicio` (the last dose taken). The countdown is recomputed from the
//! shared prescription store on every tick of a cancellable [`Ticker`].

use crate::store::PrescricaoStore;
use crate::Prescricao;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Time left until the next dose
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Countdown {
    /// Whole seconds remaining (strictly positive time left)
    Remaining { seconds: i64 },
    /// Next dose time reached or passed
    Due,
}

impl Countdown {
    /// Render with the given message for a due dose
    ///
    /// Hours wrap at 24: remaining times of a day or more are not carried
    /// into a days field.
    pub fn display(&self, due_message: &str) -> String {
        match self {
            Countdown::Remaining { seconds } => {
                let hours = (seconds / 3600) % 24;
                let minutes = (seconds / 60) % 60;
                let secs = seconds % 60;
                format!("{}h {}m {}s", hours, minutes, secs)
            }
            Countdown::Due => due_message.to_string(),
        }
    }

    pub fn is_due(&self) -> bool {
        matches!(self, Countdown::Due)
    }
}

/// Last dose plus `frequencia` hours, saturating at the latest representable instant
pub fn next_dose_time(prescricao: &Prescricao) -> DateTime<Utc> {
    prescricao
        .data_inicio
        .checked_add_signed(Duration::hours(i64::from(prescricao.frequencia)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn countdown(prescricao: &Prescricao, now: DateTime<Utc>) -> Countdown {
    let remaining_ms = (next_dose_time(prescricao) - now).num_milliseconds();
    if remaining_ms > 0 {
        Countdown::Remaining {
            seconds: remaining_ms / 1000,
        }
    } else {
        Countdown::Due
    }
}

/// One row of the countdown view
#[derive(Clone, Debug, PartialEq)]
pub struct CountdownLine {
    pub prescricao_id: i64,
    pub remedio: String,
    pub dosagem: String,
    pub next_dose: DateTime<Utc>,
    pub countdown: Countdown,
    pub text: String,
}

impl fmt::Display for CountdownLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.prescricao_id, self.remedio, self.dosagem, self.text
        )
    }
}

/// Countdown for every prescription in the shared store
#[derive(Clone, Debug)]
pub struct CountdownView {
    store: Arc<PrescricaoStore>,
    due_message: String,
}

impl CountdownView {
    pub fn new(store: Arc<PrescricaoStore>, due_message: impl Into<String>) -> Self {
        Self {
            store,
            due_message: due_message.into(),
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<CountdownLine> {
        self.store
            .all()
            .iter()
            .map(|p| {
                let countdown = countdown(p, now);
                CountdownLine {
                    prescricao_id: p.id,
                    remedio: p.remedio.nome.clone(),
                    dosagem: p.remedio.dosagem.clone(),
                    next_dose: next_dose_time(p),
                    text: countdown.display(&self.due_message),
                    countdown,
                }
            })
            .collect()
    }

    /// Recompute every `interval` and hand the lines to `on_tick`
    ///
    /// The returned ticker owns the timer; dropping it stops the updates.
    pub fn start<F>(&self, interval: std::time::Duration, mut on_tick: F) -> Ticker
    where
        F: FnMut(Vec<CountdownLine>) + Send + 'static,
    {
        let view = self.clone();
        Ticker::spawn(interval, move || on_tick(view.snapshot(Utc::now())))
    }
}

/// A repeating task on its own thread, stopped by `cancel` or drop
pub struct Ticker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn<F>(interval: std::time::Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = std::thread::spawn(move || loop {
            match stopped.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => tick(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        tracing::debug!("Ticker started ({:?} interval)", interval);
        Self {
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    /// Stop the timer and wait for an in-flight tick to finish
    pub fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Ticker thread panicked");
            }
            tracing::debug!("Ticker cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::prescricao;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const DUE: &str = "Hora de tomar o remédio!";

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_remaining_time_formatting() {
        let p = prescricao(1, 8, at(8, 0, 0));

        let c = countdown(&p, at(12, 29, 15));
        assert_eq!(c, Countdown::Remaining { seconds: 3 * 3600 + 30 * 60 + 45 });
        assert_eq!(c.display(DUE), "3h 30m 45s");
    }

    #[test]
    fn test_due_at_and_after_next_dose() {
        let p = prescricao(1, 8, at(8, 0, 0));

        assert_eq!(countdown(&p, at(16, 0, 0)), Countdown::Due);
        assert_eq!(countdown(&p, at(23, 0, 0)).display(DUE), DUE);
    }

    #[test]
    fn test_hours_wrap_at_a_day() {
        let p = prescricao(1, 30, at(0, 0, 0));

        // 29h 59m 59s left renders without a days field
        let c = countdown(&p, at(0, 0, 1));
        assert_eq!(c.display(DUE), "5h 59m 59s");
    }

    #[test]
    fn test_sub_second_remaining_is_not_due() {
        let p = prescricao(1, 1, at(8, 0, 0));
        let now = at(9, 0, 0) - Duration::milliseconds(400);

        let c = countdown(&p, now);
        assert_eq!(c, Countdown::Remaining { seconds: 0 });
        assert_eq!(c.display(DUE), "0h 0m 0s");
    }

    #[test]
    fn test_huge_frequency_saturates() {
        let now = Utc::now();
        let p = prescricao(1, u32::MAX, now);

        assert_eq!(next_dose_time(&p), DateTime::<Utc>::MAX_UTC);
        let c = countdown(&p, now);
        assert!(!c.is_due());

        let store = Arc::new(PrescricaoStore::new());
        store.replace(vec![p]);
        let lines = CountdownView::new(store, DUE).snapshot(now);
        assert_eq!(lines[0].next_dose, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_zero_frequency_is_due_immediately() {
        let p = prescricao(1, 0, at(8, 0, 0));
        assert!(countdown(&p, at(8, 0, 0)).is_due());
    }

    #[test]
    fn test_view_follows_store_patches() {
        let store = Arc::new(PrescricaoStore::new());
        store.replace(vec![prescricao(1, 4, at(8, 0, 0)), prescricao(2, 6, at(9, 0, 0))]);
        let view = CountdownView::new(store.clone(), DUE);

        let lines = view.snapshot(at(13, 0, 0));
        assert_eq!(lines[0].text, DUE);
        assert_eq!(lines[1].text, "2h 0m 0s");

        store.replace(vec![prescricao(1, 4, at(12, 0, 0))]);
        let lines = view.snapshot(at(13, 0, 0));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "3h 0m 0s");
        assert_eq!(lines[0].to_string(), "[1] Remédio 1 (500mg): 3h 0m 0s");
    }

    #[test]
    fn test_ticker_ticks_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let mut ticker = Ticker::spawn(std::time::Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::sleep(std::time::Duration::from_millis(120));
        ticker.cancel();
        assert!(!ticker.is_running());

        let after_cancel = count.load(Ordering::SeqCst);
        assert!(after_cancel >= 1);
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn test_dropping_view_ticker_stops_updates() {
        let store = Arc::new(PrescricaoStore::new());
        store.replace(vec![prescricao(1, 4, Utc::now())]);
        let view = CountdownView::new(store, DUE);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let ticker = view.start(std::time::Duration::from_millis(10), move |lines| {
            sink.lock().unwrap().push(lines.len());
        });

        std::thread::sleep(std::time::Duration::from_millis(80));
        drop(ticker);

        let ticks = seen.lock().unwrap().len();
        assert!(ticks >= 1);
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(seen.lock().unwrap().len(), ticks);
        assert!(seen.lock().unwrap().iter().all(|&n| n == 1));
    }
}
