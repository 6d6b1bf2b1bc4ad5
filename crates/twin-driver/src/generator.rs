//! Periodic record producer.

use std::time::Duration;

use crossbeam_channel::{select, tick, Receiver};
use twin_core::Record;
use twin_queue::Producer;

/// Anything that can make up records.
pub trait RecordSource: Send {
    fn next_record(&mut self) -> Record;
}

/// Numbered phones, with every third login carrying an extra `s`.
///
/// With the default prefixes this yields `(+7-915-1, Mobious)`,
/// `(+7-915-2, Mobiou)`, `(+7-915-3, Mobiou)`, `(+7-915-4, Mobious)`, ...
#[derive(Clone, Debug)]
pub struct SequentialSource {
    counter: u64,
    phone_prefix: String,
    login_stem: String,
}

impl SequentialSource {
    pub fn new(phone_prefix: impl Into<String>, login_stem: impl Into<String>) -> Self {
        Self {
            counter: 0,
            phone_prefix: phone_prefix.into(),
            login_stem: login_stem.into(),
        }
    }
}

impl Default for SequentialSource {
    fn default() -> Self {
        Self::new("+7-915-", "Mobiou")
    }
}

impl RecordSource for SequentialSource {
    fn next_record(&mut self) -> Record {
        let mut login = self.login_stem.clone();
        if self.counter % 3 == 0 {
            login.push('s');
        }
        self.counter += 1;
        Record::new(format!("{}{}", self.phone_prefix, self.counter), login)
    }
}

/// Why the generator loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorStop {
    /// The stop channel fired or its sender was dropped.
    Requested,
    /// The queue was closed under us.
    QueueClosed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorReport {
    pub produced: u64,
    pub reason: GeneratorStop,
}

/// Pushes one record per period until told to stop.
pub struct Generator<S> {
    source: S,
    output: Producer<Record>,
    period: Duration,
}

impl<S: RecordSource> Generator<S> {
    pub fn new(source: S, output: Producer<Record>, period: Duration) -> Self {
        Self {
            source,
            output,
            period,
        }
    }

    /// Produce immediately, then once per period. A message on `stop` (or
    /// its disconnection) interrupts the wait between productions.
    pub fn run(mut self, stop: &Receiver<()>) -> GeneratorReport {
        let ticker = tick(self.period);
        let mut produced = 0u64;

        tracing::info!(
            target: "twin::generator",
            period_ms = self.period.as_millis() as u64,
            "generator started"
        );

        let reason = loop {
            let record = self.source.next_record();
            tracing::debug!(target: "twin::generator", %record, "adding");
            if self.output.push(record).is_err() {
                break GeneratorStop::QueueClosed;
            }
            produced += 1;

            select! {
                recv(stop) -> _ => break GeneratorStop::Requested,
                recv(ticker) -> _ => {}
            }
        };

        tracing::info!(target: "twin::generator", produced, ?reason, "generator stopped");
        GeneratorReport { produced, reason }
    }
}
