//! The vote coordinator: ties the chain event stream, the aggregate price
//! provider and the price poster together. One event is handled at a time, in
//! arrival order, with params updates checked ahead of period starts.

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::{
	price_poster::new_prevote,
	types::{EventStream, Params, Price, PricePoster, PriceProvider, Prevote, VotingPeriod},
};

enum Event {
	Shutdown,
	ParamsUpdate(Option<Params>),
	VotingPeriodStarted(Option<VotingPeriod>),
}

pub struct Feeder<E, P, Po> {
	event_stream: E,
	price_provider: P,
	price_poster: Po,
	params: Option<Params>,
	/// The commit awaiting its reveal. Owned here and nowhere else; there is
	/// never more than one in flight.
	previous_prevote: Option<Prevote>,
}

impl<E, P, Po> Feeder<E, P, Po>
where
	E: EventStream,
	P: PriceProvider,
	Po: PricePoster,
{
	pub fn new(event_stream: E, price_provider: P, price_poster: Po) -> Self {
		Self { event_stream, price_provider, price_poster, params: None, previous_prevote: None }
	}

	/// Runs until shutdown is signalled or the event stream closes, then
	/// shuts down the stream.
	pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
		info!("starting feeder");
		loop {
			let event = {
				let (params_rx, voting_period_rx) = self.event_stream.signals();
				tokio::select! {
					biased;

					_ = &mut shutdown => Event::Shutdown,
					params = params_rx.recv() => Event::ParamsUpdate(params),
					voting_period = voting_period_rx.recv() => Event::VotingPeriodStarted(voting_period),
				}
			};

			match event {
				Event::Shutdown
				| Event::ParamsUpdate(None)
				| Event::VotingPeriodStarted(None) => break,
				Event::ParamsUpdate(Some(params)) => self.handle_params_update(params),
				Event::VotingPeriodStarted(Some(voting_period)) => {
					self.handle_voting_period_started(voting_period).await
				},
			}
		}
		info!("stopping feeder");
		self.event_stream.close();
	}

	fn handle_params_update(&mut self, params: Params) {
		// A prevote referring to pairs outside the new whitelist can never
		// pass hash verification on reveal, so it is dead weight.
		if let Some(previous) = &self.previous_prevote {
			if previous.prices.iter().any(|price| !params.pairs.contains(&price.pair)) {
				warn!("dropping prevote whose pairs are no longer whitelisted");
				self.previous_prevote = None;
			}
		}
		info!(
			vote_period_blocks = params.vote_period_blocks,
			pairs = ?params.pairs,
			"oracle params updated"
		);
		self.params = Some(params);
	}

	async fn handle_voting_period_started(&mut self, voting_period: VotingPeriod) {
		let Some(params) = self.params.clone() else {
			debug!(
				height = voting_period.height,
				"dropping voting period event, oracle params not known yet"
			);
			return;
		};
		info!(height = voting_period.height, "new voting period");
		self.vote_tick(&params, voting_period).await;
	}

	async fn vote_tick(&mut self, params: &Params, voting_period: VotingPeriod) {
		let mut prices = Vec::with_capacity(params.pairs.len());
		for pair in &params.pairs {
			prices.push(self.price_provider.get_price(pair).await);
		}

		let valid_prices: Vec<Price> =
			prices.iter().filter(|price| price.valid).cloned().collect();
		if valid_prices.is_empty() {
			warn!(
				height = voting_period.height,
				"no valid prices for this voting period, skipping vote"
			);
			self.previous_prevote = None;
			return;
		}

		let new_prevote =
			new_prevote(valid_prices, voting_period.height, self.price_poster.whoami());

		match self
			.price_poster
			.send_prices(voting_period, &prices, &new_prevote, self.previous_prevote.as_ref())
			.await
		{
			Ok(_tx_hash) => self.previous_prevote = Some(new_prevote),
			// Logged and counted by the poster. The old prevote stays put;
			// its reveal window has passed either way.
			Err(_) => {},
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{
		collections::HashMap,
		sync::{
			atomic::{AtomicBool, Ordering},
			Arc, Mutex,
		},
	};

	use anyhow::{bail, Result};
	use async_trait::async_trait;
	use tokio::sync::mpsc;

	use super::*;
	use crate::types::AssetPair;

	struct TestStream {
		params_rx: mpsc::Receiver<Params>,
		voting_period_rx: mpsc::Receiver<VotingPeriod>,
	}

	impl TestStream {
		fn disconnected() -> Self {
			let (_, params_rx) = mpsc::channel(1);
			let (_, voting_period_rx) = mpsc::channel(1);
			Self { params_rx, voting_period_rx }
		}
	}

	impl EventStream for TestStream {
		fn signals(
			&mut self,
		) -> (&mut mpsc::Receiver<Params>, &mut mpsc::Receiver<VotingPeriod>) {
			(&mut self.params_rx, &mut self.voting_period_rx)
		}

		fn close(&mut self) {}
	}

	struct TestProvider {
		prices: Arc<Mutex<HashMap<AssetPair, Price>>>,
	}

	#[async_trait]
	impl PriceProvider for TestProvider {
		async fn get_price(&self, pair: &AssetPair) -> Price {
			self.prices
				.lock()
				.unwrap()
				.get(pair)
				.cloned()
				.unwrap_or_else(|| Price::missing(pair.clone()))
		}
	}

	#[derive(Debug)]
	struct SentVote {
		voting_period: VotingPeriod,
		prices: Vec<Price>,
		new_prevote: Prevote,
		previous_prevote: Option<Prevote>,
	}

	#[derive(Clone)]
	struct TestPoster {
		sent: Arc<Mutex<Vec<SentVote>>>,
		fail: Arc<AtomicBool>,
	}

	impl TestPoster {
		fn new() -> Self {
			Self { sent: Arc::new(Mutex::new(Vec::new())), fail: Arc::new(AtomicBool::new(false)) }
		}
	}

	#[async_trait]
	impl PricePoster for TestPoster {
		fn whoami(&self) -> &str {
			"vscvaloper1test"
		}

		async fn send_prices(
			&mut self,
			voting_period: VotingPeriod,
			prices: &[Price],
			new_prevote: &Prevote,
			previous_prevote: Option<&Prevote>,
		) -> Result<String> {
			self.sent.lock().unwrap().push(SentVote {
				voting_period,
				prices: prices.to_vec(),
				new_prevote: new_prevote.clone(),
				previous_prevote: previous_prevote.cloned(),
			});
			if self.fail.load(Ordering::SeqCst) {
				bail!("broadcast failed");
			}
			Ok("C0FFEE".to_string())
		}
	}

	fn valid_price(pair: &str, value: f64) -> Price {
		Price {
			pair: AssetPair::from(pair),
			value,
			source_name: "bitfinex".to_string(),
			valid: true,
		}
	}

	fn feeder_with(
		prices: &[Price],
	) -> (Feeder<TestStream, TestProvider, TestPoster>, TestPoster, Arc<Mutex<HashMap<AssetPair, Price>>>)
	{
		let price_map: HashMap<AssetPair, Price> =
			prices.iter().map(|price| (price.pair.clone(), price.clone())).collect();
		let price_map = Arc::new(Mutex::new(price_map));
		let poster = TestPoster::new();
		let feeder = Feeder::new(
			TestStream::disconnected(),
			TestProvider { prices: price_map.clone() },
			poster.clone(),
		);
		(feeder, poster, price_map)
	}

	fn params(pairs: &[&str]) -> Params {
		Params { pairs: pairs.iter().map(|p| AssetPair::from(*p)).collect(), vote_period_blocks: 10 }
	}

	#[tokio::test]
	async fn period_events_without_params_are_dropped() {
		let (mut feeder, poster, _) = feeder_with(&[valid_price("ubtc:unusd", 30_000.0)]);

		feeder.handle_voting_period_started(VotingPeriod { height: 100 }).await;
		assert!(poster.sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn first_period_commits_without_a_reveal() {
		let (mut feeder, poster, _) = feeder_with(&[valid_price("ubtc:unusd", 30_000.0)]);
		feeder.handle_params_update(params(&["ubtc:unusd"]));

		feeder.handle_voting_period_started(VotingPeriod { height: 100 }).await;

		let sent = poster.sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].voting_period, VotingPeriod { height: 100 });
		assert_eq!(sent[0].prices, vec![valid_price("ubtc:unusd", 30_000.0)]);
		assert!(sent[0].previous_prevote.is_none());
		assert_eq!(sent[0].new_prevote.submitted_at_height, 100);
		assert_eq!(sent[0].new_prevote.prices, vec![valid_price("ubtc:unusd", 30_000.0)]);
	}

	#[tokio::test]
	async fn second_period_reveals_the_committed_rates_not_fresh_ones() {
		let (mut feeder, poster, price_map) = feeder_with(&[valid_price("ubtc:unusd", 30_000.0)]);
		feeder.handle_params_update(params(&["ubtc:unusd"]));

		feeder.handle_voting_period_started(VotingPeriod { height: 100 }).await;
		assert!(feeder.previous_prevote.is_some());

		// the market moves between the two periods
		price_map
			.lock()
			.unwrap()
			.insert(AssetPair::from("ubtc:unusd"), valid_price("ubtc:unusd", 31_000.0));
		feeder.handle_voting_period_started(VotingPeriod { height: 110 }).await;

		let sent = poster.sent.lock().unwrap();
		assert_eq!(sent.len(), 2);
		let reveal = sent[1].previous_prevote.as_ref().unwrap();
		assert_eq!(reveal.prices[0].value, 30_000.0);
		assert_eq!(reveal.salt, sent[0].new_prevote.salt);
		assert_eq!(sent[1].new_prevote.prices[0].value, 31_000.0);
	}

	#[tokio::test]
	async fn whitelist_change_suppresses_the_stale_reveal() {
		let (mut feeder, poster, price_map) = feeder_with(&[
			valid_price("uatom:unusd", 10.0),
			valid_price("ubtc:unusd", 30_000.0),
		]);
		feeder.handle_params_update(params(&["uatom:unusd", "ubtc:unusd"]));
		feeder.handle_voting_period_started(VotingPeriod { height: 100 }).await;
		assert!(feeder.previous_prevote.is_some());

		// ubtc leaves the whitelist before the reveal period
		price_map
			.lock()
			.unwrap()
			.insert(AssetPair::from("ueth:unusd"), valid_price("ueth:unusd", 2_000.0));
		feeder.handle_params_update(params(&["uatom:unusd", "ueth:unusd"]));
		assert!(feeder.previous_prevote.is_none());

		feeder.handle_voting_period_started(VotingPeriod { height: 110 }).await;
		let sent = poster.sent.lock().unwrap();
		assert_eq!(sent.len(), 2);
		assert!(sent[1].previous_prevote.is_none());
		assert_eq!(
			sent[1].new_prevote.prices.iter().map(|p| p.pair.as_str()).collect::<Vec<_>>(),
			vec!["uatom:unusd", "ueth:unusd"],
		);
	}

	#[tokio::test]
	async fn a_params_update_keeping_the_pairs_keeps_the_prevote() {
		let (mut feeder, _, _) = feeder_with(&[valid_price("ubtc:unusd", 30_000.0)]);
		feeder.handle_params_update(params(&["ubtc:unusd"]));
		feeder.handle_voting_period_started(VotingPeriod { height: 100 }).await;
		assert!(feeder.previous_prevote.is_some());

		// a superset whitelist does not invalidate the pending reveal
		feeder.handle_params_update(params(&["ubtc:unusd", "ueth:unusd"]));
		assert!(feeder.previous_prevote.is_some());
	}

	#[tokio::test]
	async fn invalid_prices_are_posted_but_not_committed() {
		let (mut feeder, poster, _) = feeder_with(&[valid_price("ubtc:unusd", 30_000.0)]);
		feeder.handle_params_update(params(&["ubtc:unusd", "ueth:unusd"]));

		feeder.handle_voting_period_started(VotingPeriod { height: 100 }).await;

		let sent = poster.sent.lock().unwrap();
		// the full price set reaches the poster, invalid entries included
		assert_eq!(sent[0].prices.len(), 2);
		assert!(!sent[0].prices[1].valid);
		// but only valid rates are committed
		assert_eq!(sent[0].new_prevote.prices.len(), 1);
	}

	#[tokio::test]
	async fn a_period_with_no_valid_prices_is_skipped_and_resets_the_prevote() {
		let (mut feeder, poster, price_map) = feeder_with(&[valid_price("ubtc:unusd", 30_000.0)]);
		feeder.handle_params_update(params(&["ubtc:unusd"]));
		feeder.handle_voting_period_started(VotingPeriod { height: 100 }).await;
		assert!(feeder.previous_prevote.is_some());

		price_map.lock().unwrap().clear();
		feeder.handle_voting_period_started(VotingPeriod { height: 110 }).await;

		assert!(feeder.previous_prevote.is_none());
		assert_eq!(poster.sent.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn poster_failure_leaves_the_prevote_unchanged() {
		let (mut feeder, poster, _) = feeder_with(&[valid_price("ubtc:unusd", 30_000.0)]);
		feeder.handle_params_update(params(&["ubtc:unusd"]));
		feeder.handle_voting_period_started(VotingPeriod { height: 100 }).await;
		let committed = feeder.previous_prevote.clone().unwrap();

		poster.fail.store(true, Ordering::SeqCst);
		feeder.handle_voting_period_started(VotingPeriod { height: 110 }).await;

		assert_eq!(feeder.previous_prevote, Some(committed));
	}
}
