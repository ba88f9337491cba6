//! The chain event stream: two worker tasks turn the node's block feed and
//! params queries into the [Params] and [VotingPeriod] signal streams the
//! vote coordinator consumes.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::{
	mpsc::{self, error::TrySendError},
	watch, Notify,
};
use tracing::{debug, info, warn};

use crate::{
	chain_client::ChainClient,
	constants::{PARAMS_POLL_INTERVAL, WS_RECONNECT_BASE_DELAY, WS_RECONNECT_MAX_DELAY},
	types::{ChainEvents, EventStream, Params, VotingPeriod},
};

/// The concrete [EventStream]. Signals are buffered at depth one; a consumer
/// that lags behind sees only the freshest value.
pub struct Stream {
	params_rx: mpsc::Receiver<Params>,
	voting_period_rx: mpsc::Receiver<VotingPeriod>,
	shutdown_tx: watch::Sender<bool>,
}

impl Stream {
	pub fn dial(
		websocket_endpoint: &str,
		grpc_endpoint: &str,
		enable_tls: bool,
	) -> Result<Self> {
		Ok(Self::new(Arc::new(ChainClient::new(
			websocket_endpoint,
			grpc_endpoint,
			enable_tls,
		)?)))
	}

	pub fn new<C: ChainEvents>(client: Arc<C>) -> Self {
		let (params_tx, params_rx) = mpsc::channel(1);
		let (voting_period_tx, voting_period_rx) = mpsc::channel(1);
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		// The block listener needs the current vote period to spot
		// boundaries; the params poller learns it first.
		let (vote_period_tx, vote_period_rx) = watch::channel(0u64);
		let refresh_params = Arc::new(Notify::new());

		tokio::spawn(block_listener(
			client.clone(),
			voting_period_tx,
			vote_period_rx,
			refresh_params.clone(),
			shutdown_rx.clone(),
		));
		tokio::spawn(params_poller(
			client,
			params_tx,
			vote_period_tx,
			refresh_params,
			shutdown_rx,
		));

		Self { params_rx, voting_period_rx, shutdown_tx }
	}
}

impl Stream {
	/// Yields the latest [Params] whenever they change.
	pub fn params_update(&mut self) -> &mut mpsc::Receiver<Params> {
		&mut self.params_rx
	}

	/// Yields a [VotingPeriod] the moment the chain begins a new one.
	pub fn voting_period_started(&mut self) -> &mut mpsc::Receiver<VotingPeriod> {
		&mut self.voting_period_rx
	}
}

impl EventStream for Stream {
	fn signals(&mut self) -> (&mut mpsc::Receiver<Params>, &mut mpsc::Receiver<VotingPeriod>) {
		(&mut self.params_rx, &mut self.voting_period_rx)
	}

	fn close(&mut self) {
		let _ = self.shutdown_tx.send(true);
	}
}

/// Multiples of `vote_period` in `(last_height, height]`, or at exactly
/// `height` when no height was seen before. Each returned height starts a new
/// voting period; heights skipped by the socket are synthesized here so a gap
/// never swallows a boundary.
pub(crate) fn voting_period_boundaries(
	last_height: Option<u64>,
	height: u64,
	vote_period: u64,
) -> Vec<u64> {
	if vote_period == 0 {
		return Vec::new();
	}
	let start = match last_height {
		Some(last) if last >= height => return Vec::new(),
		Some(last) => last + 1,
		None => height,
	};
	let first = start.next_multiple_of(vote_period);
	(first..=height).step_by(vote_period as usize).collect()
}

fn next_backoff(current: Duration) -> Duration {
	std::cmp::min(current * 2, WS_RECONNECT_MAX_DELAY)
}

async fn block_listener<C: ChainEvents>(
	client: Arc<C>,
	voting_period_tx: mpsc::Sender<VotingPeriod>,
	vote_period: watch::Receiver<u64>,
	refresh_params: Arc<Notify>,
	mut shutdown: watch::Receiver<bool>,
) {
	let mut last_height: Option<u64> = None;
	let mut backoff = WS_RECONNECT_BASE_DELAY;

	loop {
		let mut blocks = tokio::select! {
			_ = shutdown.changed() => return,
			result = client.subscribe_block_events() => match result {
				Ok(blocks) => {
					backoff = WS_RECONNECT_BASE_DELAY;
					blocks
				},
				Err(e) => {
					warn!("failed to subscribe to block events, retrying in {backoff:?}: {e:#}");
					tokio::select! {
						_ = shutdown.changed() => return,
						_ = tokio::time::sleep(backoff) => {},
					}
					backoff = next_backoff(backoff);
					continue;
				},
			},
		};

		loop {
			tokio::select! {
				_ = shutdown.changed() => return,
				event = blocks.next() => match event {
					Some(block) => {
						let period = *vote_period.borrow();
						for height in voting_period_boundaries(last_height, block.height, period) {
							info!(height, "signaled new voting period");
							match voting_period_tx.try_send(VotingPeriod { height }) {
								Ok(()) => {},
								// Dropping beats stalling the socket reader;
								// the coordinator votes next period instead.
								Err(TrySendError::Full(_)) => {
									debug!(height, "voting period consumer busy, dropping signal");
								},
								Err(TrySendError::Closed(_)) => return,
							}
							refresh_params.notify_one();
						}
						last_height = Some(block.height);
					},
					None => {
						warn!("block event subscription closed, reconnecting");
						break;
					},
				},
			}
		}
	}
}

async fn params_poller<C: ChainEvents>(
	client: Arc<C>,
	params_tx: mpsc::Sender<Params>,
	vote_period_tx: watch::Sender<u64>,
	refresh: Arc<Notify>,
	mut shutdown: watch::Receiver<bool>,
) {
	let mut last_emitted: Option<Params> = None;
	let mut tick = tokio::time::interval(PARAMS_POLL_INTERVAL);
	tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			_ = shutdown.changed() => return,
			_ = tick.tick() => {},
			_ = refresh.notified() => {},
		}

		let params = tokio::select! {
			_ = shutdown.changed() => return,
			result = fetch_params(client.as_ref()) => match result {
				Ok(params) => params,
				Err(e) => {
					warn!("failed to fetch oracle params: {e:#}");
					continue;
				},
			},
		};

		if last_emitted.as_ref() == Some(&params) {
			debug!("skipping params update as they're not different from the old ones");
			continue;
		}

		let _ = vote_period_tx.send(params.vote_period_blocks);
		info!(
			vote_period_blocks = params.vote_period_blocks,
			pairs = ?params.pairs,
			"oracle params update"
		);
		if params_tx.send(params.clone()).await.is_err() {
			return;
		}
		last_emitted = Some(params);
	}
}

/// The vote-target query is the authoritative whitelist view; params fill in
/// the period length (and the pair list when targets are not served).
async fn fetch_params<C: ChainEvents>(client: &C) -> Result<Params> {
	let mut params = client.query_oracle_params().await?;
	let targets = client.query_vote_targets().await?;
	if !targets.is_empty() {
		params.pairs = targets;
	}
	Ok(params)
}
