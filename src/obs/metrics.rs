/// Provider steps labeled in spans and the `acr_auth_flow_total` counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowKind {
	/// End-to-end `provide` call.
	Provide,
	/// Identity token refresh against the identity provider.
	IdentityRefresh,
	/// Client construction plus the registry refresh-token exchange.
	RegistryExchange,
}
impl FlowKind {
	/// Label value used for the `flow` field.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Provide => "provide",
			Self::IdentityRefresh => "identity_refresh",
			Self::RegistryExchange => "registry_exchange",
		}
	}
}

/// Outcome label recorded for every step entry and exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowOutcome {
	/// Step entered.
	Attempt,
	/// Step returned `Ok`.
	Success,
	/// Step returned an error.
	Failure,
}
impl FlowOutcome {
	/// Label value used for the `outcome` field.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}

/// Receives exchange latency reports.
///
/// Implementations run on the request path: they must return promptly and must not fail.
pub trait MetricsSink
where
	Self: Send + Sync,
{
	/// Records how long client construction plus the exchange took for `registry_host`.
	fn record_exchange_duration(&self, elapsed: std::time::Duration, registry_host: &str);
}

/// [`MetricsSink`] forwarding to the global `metrics` recorder (when enabled).
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalMetricsSink;
impl MetricsSink for GlobalMetricsSink {
	fn record_exchange_duration(&self, elapsed: std::time::Duration, registry_host: &str) {
		#[cfg(feature = "metrics")]
		{
			metrics::histogram!(
				"acr_auth_exchange_duration_seconds",
				"registry" => registry_host.to_owned()
			)
			.record(elapsed.as_secs_f64());
		}

		#[cfg(not(feature = "metrics"))]
		{
			let _ = (elapsed, registry_host);
		}
	}
}

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"acr_auth_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}
