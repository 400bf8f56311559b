//! Price Notifier - decides when a tracked pair must be re-published
//!
//! Each `execute` round fetches every tracked pair through the aggregator,
//! trims the prices to the pair precision and batches every pair that moved
//! enough (or whose heartbeat is due) into a single notifee call. The
//! last-notified table only changes after the notifee accepted the batch.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::NotifierError;
use crate::oracle::aggregator::PriceProvider;
use crate::oracle::polling::Executor;
use crate::types::{ArgsPriceChanged, Pair};

/// Shortest accepted heartbeat interval
pub const MIN_AUTO_SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Receiver of notification batches (e.g. an on-chain price updater)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceNotifee: Send + Sync {
    async fn price_changed(
        &self,
        cancel: &CancellationToken,
        args: &[ArgsPriceChanged],
    ) -> Result<()>;
}

/// Notifee that only logs the batch
#[derive(Debug, Clone, Default)]
pub struct LogNotifee;

#[async_trait]
impl PriceNotifee for LogNotifee {
    async fn price_changed(
        &self,
        _cancel: &CancellationToken,
        args: &[ArgsPriceChanged],
    ) -> Result<()> {
        for arg in args {
            tracing::info!(
                base = %arg.base,
                quote = %arg.quote,
                denominated_price = arg.denominated_price,
                denomination_factor = arg.denomination_factor,
                decimals = arg.decimals,
                timestamp = arg.timestamp,
                "Price changed"
            );
        }
        Ok(())
    }
}

pub struct PriceNotifierArgs {
    pub pairs: Vec<Pair>,
    pub provider: Arc<dyn PriceProvider>,
    pub notifee: Arc<dyn PriceNotifee>,
    pub auto_send_interval: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
struct NotifyState {
    /// `None` until the pair was notified once
    last_notified_price: Option<f64>,
    /// `None` until the first heartbeat went out
    last_auto_sent: Option<Instant>,
}

/// Outcome of the notify check for one pair in one round
#[derive(Debug, Clone, Copy)]
struct Decision {
    index: usize,
    point: PricePoint,
    auto_send: bool,
}

/// A fetched price after trimming, with its on-chain integer form
#[derive(Debug, Clone, Copy, PartialEq)]
struct PricePoint {
    price: f64,
    denominated: u64,
}

pub struct PriceNotifier {
    pairs: Vec<Pair>,
    provider: Arc<dyn PriceProvider>,
    notifee: Arc<dyn PriceNotifee>,
    auto_send_interval: Duration,
    /// Indexed like `pairs`
    states: RwLock<Vec<NotifyState>>,
}

impl PriceNotifier {
    pub fn new(args: PriceNotifierArgs) -> Result<Self, NotifierError> {
        if args.pairs.is_empty() {
            return Err(NotifierError::NoPairs);
        }
        if args.auto_send_interval < MIN_AUTO_SEND_INTERVAL {
            return Err(NotifierError::InvalidAutoSendInterval {
                got: args.auto_send_interval,
                min: MIN_AUTO_SEND_INTERVAL,
            });
        }

        let states = vec![NotifyState::default(); args.pairs.len()];

        Ok(Self {
            pairs: args.pairs,
            provider: args.provider,
            notifee: args.notifee,
            auto_send_interval: args.auto_send_interval,
            states: RwLock::new(states),
        })
    }

    /// Run one fetch → decide → notify round
    pub async fn execute(&self, cancel: &CancellationToken) -> Result<(), NotifierError> {
        let points = self.fetch_prices(cancel).await?;

        let now = Instant::now();
        let decisions = self.evaluate(&points, now).await;
        if decisions.is_empty() {
            tracing::debug!(pairs = self.pairs.len(), "No price changes to notify");
            return Ok(());
        }

        let timestamp = Utc::now().timestamp();
        let batch: Vec<ArgsPriceChanged> = decisions
            .iter()
            .map(|decision| {
                let pair = &self.pairs[decision.index];
                ArgsPriceChanged {
                    base: pair.base().to_string(),
                    quote: pair.quote().to_string(),
                    denominated_price: decision.point.denominated,
                    denomination_factor: pair.denomination_factor(),
                    decimals: u64::from(pair.decimals()),
                    timestamp,
                }
            })
            .collect();

        self.notifee
            .price_changed(cancel, &batch)
            .await
            .map_err(NotifierError::Notifee)?;

        self.commit(&decisions, now).await;

        tracing::info!(
            notified = batch.len(),
            pairs = %batch.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", "),
            "Price changes notified"
        );

        Ok(())
    }

    /// Snapshot of the last notified (trimmed) price per pair
    pub async fn last_notified_prices(&self) -> Vec<Option<f64>> {
        self.states
            .read()
            .await
            .iter()
            .map(|s| s.last_notified_price)
            .collect()
    }

    /// Fetch, trim and denominate every pair in order. The first failure
    /// aborts the round, so a price that cannot go on-chain never reaches
    /// the notifee.
    async fn fetch_prices(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<PricePoint>, NotifierError> {
        let mut points = Vec::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            let price = self
                .provider
                .fetch_price(cancel, pair.base(), pair.quote())
                .await
                .map_err(|source| NotifierError::Fetch {
                    base: pair.base().to_string(),
                    quote: pair.quote().to_string(),
                    source,
                })?;

            let trimmed = pair.trim(price);
            if !trimmed.is_finite() || trimmed <= 0.0 {
                return Err(NotifierError::InvalidPrice {
                    base: pair.base().to_string(),
                    quote: pair.quote().to_string(),
                    price,
                });
            }
            let denominated = pair
                .denominate(trimmed)
                .map_err(|source| NotifierError::Denomination {
                    base: pair.base().to_string(),
                    quote: pair.quote().to_string(),
                    source,
                })?;

            points.push(PricePoint {
                price: trimmed,
                denominated,
            });
        }
        Ok(points)
    }

    async fn evaluate(&self, points: &[PricePoint], now: Instant) -> Vec<Decision> {
        let states = self.states.read().await;

        self.pairs
            .iter()
            .zip(points.iter().copied())
            .zip(states.iter())
            .enumerate()
            .filter_map(|(index, ((pair, point), state))| {
                let auto_send = match state.last_auto_sent {
                    None => true,
                    Some(sent) => now.duration_since(sent) >= self.auto_send_interval,
                };
                let changed = price_changed_enough(state.last_notified_price, point.price, pair);

                if changed || auto_send {
                    tracing::debug!(
                        pair = %pair,
                        last = ?state.last_notified_price,
                        price = point.price,
                        changed,
                        auto_send,
                        "Pair will be notified"
                    );
                    Some(Decision {
                        index,
                        point,
                        auto_send,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    async fn commit(&self, decisions: &[Decision], now: Instant) {
        let mut states = self.states.write().await;
        for decision in decisions {
            let state = &mut states[decision.index];
            state.last_notified_price = Some(decision.point.price);
            if decision.auto_send {
                state.last_auto_sent = Some(now);
            }
        }
    }
}

#[async_trait]
impl Executor for PriceNotifier {
    async fn execute(&self, cancel: &CancellationToken) -> Result<()> {
        PriceNotifier::execute(self, cancel).await?;
        Ok(())
    }
}

/// True when `new_price` moved at least the pair threshold away from
/// `last_price`, or when nothing was notified yet.
fn price_changed_enough(last_price: Option<f64>, new_price: f64, pair: &Pair) -> bool {
    let Some(last_price) = last_price else {
        return true;
    };

    let percentage_change = (last_price - new_price).abs() * 100.0 / last_price;
    percentage_change >= f64::from(pair.percent_difference_to_notify())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AggregatorError;
    use crate::oracle::aggregator::MockPriceProvider;
    use crate::types::PairArgs;
    use std::sync::Mutex;

    const INTERVAL: Duration = Duration::from_secs(60);

    fn pair(base: &str, percent: u32, decimals: u32) -> Pair {
        Pair::new(
            PairArgs {
                base: base.to_string(),
                quote: "USD".to_string(),
                percent_difference_to_notify: percent,
                decimals,
                exchanges: vec!["Binance".to_string()],
            },
            0,
        )
        .unwrap()
    }

    /// Provider answering with a price per base that tests can change
    #[derive(Clone, Default)]
    struct SettablePrices(Arc<Mutex<Vec<(String, f64)>>>);

    impl SettablePrices {
        fn set(&self, base: &str, price: f64) {
            let mut prices = self.0.lock().unwrap();
            prices.retain(|(b, _)| b != base);
            prices.push((base.to_string(), price));
        }
    }

    #[async_trait]
    impl PriceProvider for SettablePrices {
        async fn fetch_price(
            &self,
            _cancel: &CancellationToken,
            base: &str,
            _quote: &str,
        ) -> Result<f64, AggregatorError> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .find(|(b, _)| b == base)
                .map(|(_, p)| *p)
                .ok_or(AggregatorError::NotEnoughResponses {
                    received: 0,
                    required: 1,
                })
        }
    }

    /// Notifee keeping every batch it accepted
    #[derive(Clone, Default)]
    struct RecordingNotifee {
        batches: Arc<Mutex<Vec<Vec<ArgsPriceChanged>>>>,
    }

    impl RecordingNotifee {
        fn batches(&self) -> Vec<Vec<ArgsPriceChanged>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PriceNotifee for RecordingNotifee {
        async fn price_changed(
            &self,
            _cancel: &CancellationToken,
            args: &[ArgsPriceChanged],
        ) -> Result<()> {
            self.batches.lock().unwrap().push(args.to_vec());
            Ok(())
        }
    }

    fn notifier(
        pairs: Vec<Pair>,
        prices: &SettablePrices,
        notifee: &RecordingNotifee,
    ) -> PriceNotifier {
        PriceNotifier::new(PriceNotifierArgs {
            pairs,
            provider: Arc::new(prices.clone()),
            notifee: Arc::new(notifee.clone()),
            auto_send_interval: INTERVAL,
        })
        .unwrap()
    }

    #[test]
    fn test_new_validates_args() {
        let provider: Arc<dyn PriceProvider> = Arc::new(SettablePrices::default());
        let notifee: Arc<dyn PriceNotifee> = Arc::new(LogNotifee);

        let no_pairs = PriceNotifier::new(PriceNotifierArgs {
            pairs: Vec::new(),
            provider: Arc::clone(&provider),
            notifee: Arc::clone(&notifee),
            auto_send_interval: INTERVAL,
        });
        assert!(matches!(no_pairs, Err(NotifierError::NoPairs)));

        let short_interval = PriceNotifier::new(PriceNotifierArgs {
            pairs: vec![pair("EGLD", 1, 2)],
            provider: Arc::clone(&provider),
            notifee: Arc::clone(&notifee),
            auto_send_interval: Duration::from_millis(999),
        });
        assert!(matches!(
            short_interval,
            Err(NotifierError::InvalidAutoSendInterval { .. })
        ));

        let ok = PriceNotifier::new(PriceNotifierArgs {
            pairs: vec![pair("EGLD", 1, 2)],
            provider,
            notifee,
            auto_send_interval: MIN_AUTO_SEND_INTERVAL,
        });
        assert!(ok.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_always_notifies() {
        let prices = SettablePrices::default();
        prices.set("EGLD", 40.123456);
        let notifee = RecordingNotifee::default();
        let notifier = notifier(vec![pair("EGLD", 100, 2)], &prices, &notifee);

        notifier.execute(&CancellationToken::new()).await.unwrap();

        let batches = notifee.batches();
        assert_eq!(batches.len(), 1);
        let args = &batches[0][0];
        assert_eq!(args.base, "EGLD");
        assert_eq!(args.quote, "USD");
        assert_eq!(args.denominated_price, 4012);
        assert_eq!(args.denomination_factor, 100);
        assert_eq!(args.decimals, 2);
        assert!(args.timestamp > 0);
        assert_eq!(notifier.last_notified_prices().await, vec![Some(40.12)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_price_notifies_once() {
        let prices = SettablePrices::default();
        prices.set("EGLD", 40.0);
        let notifee = RecordingNotifee::default();
        let notifier = notifier(vec![pair("EGLD", 1, 2)], &prices, &notifee);
        let cancel = CancellationToken::new();

        notifier.execute(&cancel).await.unwrap();
        notifier.execute(&cancel).await.unwrap();

        assert_eq!(notifee.batches().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_crossing() {
        let prices = SettablePrices::default();
        prices.set("EGLD", 100.0);
        let notifee = RecordingNotifee::default();
        let notifier = notifier(vec![pair("EGLD", 5, 2)], &prices, &notifee);
        let cancel = CancellationToken::new();

        notifier.execute(&cancel).await.unwrap();

        // 4% move stays quiet
        prices.set("EGLD", 104.0);
        notifier.execute(&cancel).await.unwrap();
        assert_eq!(notifee.batches().len(), 1);

        // exactly 5% from the last notified value triggers
        prices.set("EGLD", 95.0);
        notifier.execute(&cancel).await.unwrap();
        let batches = notifee.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1][0].denominated_price, 9500);
        assert_eq!(notifier.last_notified_prices().await, vec![Some(95.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_threshold_notifies_every_round() {
        let prices = SettablePrices::default();
        prices.set("EGLD", 40.0);
        let notifee = RecordingNotifee::default();
        let notifier = notifier(vec![pair("EGLD", 0, 2)], &prices, &notifee);
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            notifier.execute(&cancel).await.unwrap();
        }

        assert_eq!(notifee.batches().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_send_after_interval() {
        let prices = SettablePrices::default();
        prices.set("EGLD", 40.0);
        let notifee = RecordingNotifee::default();
        let notifier = notifier(vec![pair("EGLD", 10, 2)], &prices, &notifee);
        let cancel = CancellationToken::new();

        notifier.execute(&cancel).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        notifier.execute(&cancel).await.unwrap();
        assert_eq!(notifee.batches().len(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        notifier.execute(&cancel).await.unwrap();
        assert_eq!(notifee.batches().len(), 2);

        // timer was reset by the heartbeat
        notifier.execute(&cancel).await.unwrap();
        assert_eq!(notifee.batches().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_keeps_pair_order() {
        let prices = SettablePrices::default();
        prices.set("EGLD", 40.0);
        prices.set("BTC", 27000.0);
        prices.set("ETH", 1650.0);
        let notifee = RecordingNotifee::default();
        let notifier = notifier(
            vec![pair("EGLD", 1, 2), pair("BTC", 1, 2), pair("ETH", 1, 2)],
            &prices,
            &notifee,
        );
        let cancel = CancellationToken::new();

        notifier.execute(&cancel).await.unwrap();
        let bases: Vec<_> = notifee.batches()[0].iter().map(|a| a.base.clone()).collect();
        assert_eq!(bases, vec!["EGLD", "BTC", "ETH"]);

        // only the moved pairs go out, still in configured order
        prices.set("ETH", 1700.0);
        prices.set("EGLD", 45.0);
        notifier.execute(&cancel).await.unwrap();
        let bases: Vec<_> = notifee.batches()[1].iter().map(|a| a.base.clone()).collect();
        assert_eq!(bases, vec!["EGLD", "ETH"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_aborts_round() {
        let prices = SettablePrices::default();
        prices.set("EGLD", 40.0);
        let mut notifee = MockPriceNotifee::new();
        notifee.expect_price_changed().never();

        let notifier = PriceNotifier::new(PriceNotifierArgs {
            pairs: vec![pair("EGLD", 1, 2), pair("MISSING", 1, 2)],
            provider: Arc::new(prices),
            notifee: Arc::new(notifee),
            auto_send_interval: INTERVAL,
        })
        .unwrap();

        let err = notifier.execute(&CancellationToken::new()).await.unwrap_err();
        match err {
            NotifierError::Fetch { base, quote, .. } => {
                assert_eq!(base, "MISSING");
                assert_eq!(quote, "USD");
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
        assert_eq!(notifier.last_notified_prices().await, vec![None, None]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifee_failure_keeps_state() {
        let mut provider = MockPriceProvider::new();
        provider.expect_fetch_price().returning(|_, _, _| Ok(40.0));

        let mut notifee = MockPriceNotifee::new();
        let mut seq = mockall::Sequence::new();
        notifee
            .expect_price_changed()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(anyhow::anyhow!("tx rejected")));
        notifee
            .expect_price_changed()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, args| args.len() == 1 && args[0].denominated_price == 4000)
            .returning(|_, _| Ok(()));

        let notifier = PriceNotifier::new(PriceNotifierArgs {
            pairs: vec![pair("EGLD", 1, 2)],
            provider: Arc::new(provider),
            notifee: Arc::new(notifee),
            auto_send_interval: INTERVAL,
        })
        .unwrap();
        let cancel = CancellationToken::new();

        let err = notifier.execute(&cancel).await.unwrap_err();
        assert!(matches!(err, NotifierError::Notifee(_)));
        assert_eq!(notifier.last_notified_prices().await, vec![None]);

        // next round retries against the untouched baseline
        notifier.execute(&cancel).await.unwrap();
        assert_eq!(notifier.last_notified_prices().await, vec![Some(40.0)]);
    }

    #[test]
    fn test_price_changed_enough() {
        let p = pair("EGLD", 2, 2);
        assert!(price_changed_enough(None, 10.0, &p));
        assert!(!price_changed_enough(Some(100.0), 101.0, &p));
        assert!(price_changed_enough(Some(100.0), 102.0, &p));
        assert!(price_changed_enough(Some(100.0), 98.0, &p));
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_trimmed_to_zero_aborts_round() {
        let mut provider = MockPriceProvider::new();
        provider.expect_fetch_price().returning(|_, _, _| Ok(0.04));
        let mut notifee = MockPriceNotifee::new();
        notifee.expect_price_changed().never();

        let notifier = PriceNotifier::new(PriceNotifierArgs {
            pairs: vec![pair("EGLD", 5, 1)],
            provider: Arc::new(provider),
            notifee: Arc::new(notifee),
            auto_send_interval: INTERVAL,
        })
        .unwrap();
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            let err = notifier.execute(&cancel).await.unwrap_err();
            assert!(matches!(
                err,
                NotifierError::InvalidPrice { ref base, .. } if base == "EGLD"
            ));
        }
        assert_eq!(notifier.last_notified_prices().await, vec![None]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_smallest_trimmed_price_notifies_once() {
        let prices = SettablePrices::default();
        prices.set("EGLD", 1e-18);
        let notifee = RecordingNotifee::default();
        let notifier = notifier(vec![pair("EGLD", 5, 18)], &prices, &notifee);
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            notifier.execute(&cancel).await.unwrap();
        }

        let batches = notifee.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].denominated_price, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_price_aborts_round() {
        let prices = SettablePrices::default();
        prices.set("EGLD", 40.0);
        prices.set("BTC", 27000.0);
        let mut notifee = MockPriceNotifee::new();
        notifee.expect_price_changed().never();

        let notifier = PriceNotifier::new(PriceNotifierArgs {
            pairs: vec![pair("EGLD", 1, 2), pair("BTC", 1, 18)],
            provider: Arc::new(prices),
            notifee: Arc::new(notifee),
            auto_send_interval: INTERVAL,
        })
        .unwrap();

        let err = notifier.execute(&CancellationToken::new()).await.unwrap_err();
        match err {
            NotifierError::Denomination { base, source, .. } => {
                assert_eq!(base, "BTC");
                assert_eq!(source.factor, 1_000_000_000_000_000_000);
            }
            other => panic!("expected denomination error, got {other:?}"),
        }
        assert_eq!(notifier.last_notified_prices().await, vec![None, None]);
    }
}
