//! Wire clients for the node: a lazily connected gRPC channel for queries and
//! tx broadcast, and a jsonrpsee websocket subscription for new-block events.

pub mod proto;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use jsonrpsee::{
	core::client::{Subscription, SubscriptionClientT},
	rpc_params,
	ws_client::WsClientBuilder,
};
use prost::Message;
use serde::Deserialize;
use tonic::{
	codegen::http::uri::PathAndQuery,
	transport::{Channel, ClientTlsConfig, Endpoint},
};
use tracing::warn;

use crate::{
	constants::RPC_TIMEOUT,
	types::{AssetPair, BlockEvent, ChainEvents, Params},
};

/// Thin wrapper around a tonic channel. Cheap to clone; all methods issue a
/// single unary call with the standard deadline.
#[derive(Clone)]
pub struct GrpcClient {
	inner: tonic::client::Grpc<Channel>,
}

impl GrpcClient {
	/// Builds a lazily connecting client; the first call dials.
	pub fn connect(grpc_endpoint: &str, enable_tls: bool) -> Result<Self> {
		let scheme = if enable_tls { "https" } else { "http" };
		let mut endpoint = Endpoint::from_shared(format!("{scheme}://{grpc_endpoint}"))?
			.timeout(RPC_TIMEOUT)
			.connect_timeout(RPC_TIMEOUT);
		if enable_tls {
			endpoint = endpoint.tls_config(ClientTlsConfig::new().with_webpki_roots())?;
		}
		Ok(Self { inner: tonic::client::Grpc::new(endpoint.connect_lazy()) })
	}

	async fn unary<Req, Resp>(&mut self, path: &'static str, request: Req) -> Result<Resp>
	where
		Req: prost::Message + 'static,
		Resp: prost::Message + Default + 'static,
	{
		self.inner
			.ready()
			.await
			.map_err(|e| anyhow!("grpc channel not ready: {e}"))?;
		let response = self
			.inner
			.unary(
				tonic::Request::new(request),
				PathAndQuery::from_static(path),
				tonic::codec::ProstCodec::default(),
			)
			.await
			.map_err(|status| anyhow!("grpc request {path} failed: {status}"))?;
		Ok(response.into_inner())
	}

	pub async fn oracle_params(&mut self) -> Result<proto::OracleParams> {
		let response: proto::QueryParamsResponse =
			self.unary("/vsc.oracle.v1.Query/Params", proto::QueryParamsRequest {}).await?;
		response.params.ok_or_else(|| anyhow!("oracle params response without params"))
	}

	pub async fn vote_targets(&mut self) -> Result<Vec<String>> {
		let response: proto::QueryVoteTargetsResponse = self
			.unary("/vsc.oracle.v1.Query/VoteTargets", proto::QueryVoteTargetsRequest {})
			.await?;
		Ok(response.vote_targets)
	}

	pub async fn account(&mut self, address: &str) -> Result<proto::BaseAccount> {
		let response: proto::QueryAccountResponse = self
			.unary(
				"/cosmos.auth.v1beta1.Query/Account",
				proto::QueryAccountRequest { address: address.to_string() },
			)
			.await?;
		let any = response.account.ok_or_else(|| anyhow!("account {address} not found"))?;

		// Eth-flavoured accounts wrap the base account; plain ones are bare.
		if any.type_url.ends_with("EthAccount") {
			proto::EthAccount::decode(any.value.as_slice())?
				.base_account
				.ok_or_else(|| anyhow!("eth account without base account"))
		} else {
			Ok(proto::BaseAccount::decode(any.value.as_slice())?)
		}
	}

	pub async fn broadcast_tx(&mut self, tx: proto::TxRaw) -> Result<proto::TxResponse> {
		let request = proto::BroadcastTxRequest {
			tx_bytes: tx.encode_to_vec(),
			mode: proto::BroadcastMode::Sync as i32,
		};
		let response: proto::BroadcastTxResponse =
			self.unary("/cosmos.tx.v1beta1.Service/BroadcastTx", request).await?;
		response.tx_response.ok_or_else(|| anyhow!("broadcast response without tx response"))
	}
}

#[derive(Debug, Deserialize)]
struct NewBlockEvent {
	height: u64,
}

/// The node-facing half of the event stream: block subscription over
/// websocket, oracle params over gRPC.
pub struct ChainClient {
	grpc: GrpcClient,
	websocket_endpoint: String,
}

impl ChainClient {
	pub fn new(websocket_endpoint: &str, grpc_endpoint: &str, enable_tls: bool) -> Result<Self> {
		Ok(Self {
			grpc: GrpcClient::connect(grpc_endpoint, enable_tls)?,
			websocket_endpoint: websocket_endpoint.to_string(),
		})
	}
}

#[async_trait]
impl ChainEvents for ChainClient {
	async fn subscribe_block_events(&self) -> Result<BoxStream<'static, BlockEvent>> {
		let client = WsClientBuilder::default()
			.connection_timeout(RPC_TIMEOUT)
			.request_timeout(RPC_TIMEOUT)
			.build(&self.websocket_endpoint)
			.await?;
		let subscription: Subscription<NewBlockEvent> = client
			.subscribe("subscribe_new_blocks", rpc_params![], "unsubscribe_new_blocks")
			.await?;

		// The client must outlive the subscription, so thread both through
		// the stream state. The stream ends when the connection drops.
		Ok(Box::pin(futures::stream::unfold(
			(client, subscription),
			|(client, mut subscription)| async move {
				loop {
					return match subscription.next().await {
						Some(Ok(event)) => {
							Some((BlockEvent { height: event.height }, (client, subscription)))
						},
						Some(Err(e)) => {
							warn!("failed to decode new block event: {e}");
							continue;
						},
						None => None,
					};
				}
			},
		)))
	}

	async fn query_oracle_params(&self) -> Result<Params> {
		let params = self.grpc.clone().oracle_params().await?;
		if params.vote_period == 0 {
			bail!("malformed oracle params: zero vote period");
		}
		Ok(Params {
			pairs: params.whitelist.into_iter().map(AssetPair::from).collect(),
			vote_period_blocks: params.vote_period,
		})
	}

	async fn query_vote_targets(&self) -> Result<Vec<AssetPair>> {
		Ok(self.grpc.clone().vote_targets().await?.into_iter().map(AssetPair::from).collect())
	}
}
