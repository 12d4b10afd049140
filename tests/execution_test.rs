//! End-to-end execution tests: discover with mocks, then execute the chosen
//! route against scripted providers.

use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use crosspay::{
    AcceptTarget, ChainId, EngineConfig, ExecutionOutcome, PaymentEngine, PaymentRequest,
    ProviderRegistry, StepKind, StepState, TokenCatalog, Units,
};
use crosspay_gateway::{
    BalanceGateway, BridgeStatus, BridgeTxState, MockBalanceGateway, MockProviderAdapter,
    MockQuoteGateway, ProviderAdapter, ProviderError, QuoteGateway,
};

const SENDER: &str = "0xA0000000000000000000000000000000000000aa";
const RECEIVER: &str = "0xB0000000000000000000000000000000000000bb";

struct Harness {
    catalog: Arc<TokenCatalog>,
    quotes: Arc<MockQuoteGateway>,
    balances: Arc<MockBalanceGateway>,
    eth_provider: Arc<MockProviderAdapter>,
    polygon_provider: Arc<MockProviderAdapter>,
    engine: PaymentEngine,
}

fn harness() -> Harness {
    let catalog = Arc::new(TokenCatalog::with_default_tokens());
    let quotes = Arc::new(MockQuoteGateway::new());
    let balances = Arc::new(MockBalanceGateway::new());
    let eth_provider = Arc::new(MockProviderAdapter::new());
    let polygon_provider = Arc::new(MockProviderAdapter::new());

    let providers = ProviderRegistry::new()
        .register(1u64, Arc::clone(&eth_provider) as Arc<dyn ProviderAdapter>)
        .register(
            137u64,
            Arc::clone(&polygon_provider) as Arc<dyn ProviderAdapter>,
        );

    let mut config = EngineConfig::default();
    // keep polling and retries fast under test
    config.execution.backoff_base_ms = 1;
    config.execution.backoff_cap_ms = 5;
    config.execution.bridge_poll_interval_ms = 5;
    config.execution.bridge_timeout_secs = 1;

    let engine = PaymentEngine::new(
        &config,
        Arc::clone(&catalog),
        Arc::clone(&quotes) as Arc<dyn QuoteGateway>,
        Arc::clone(&balances) as Arc<dyn BalanceGateway>,
        providers,
    );

    Harness {
        catalog,
        quotes,
        balances,
        eth_provider,
        polygon_provider,
        engine,
    }
}

async fn discover_bridge_route(h: &Harness) -> crosspay::PaymentRoute {
    let eth = ChainId::numeric(1);
    let polygon = ChainId::numeric(137);
    let usdc_eth = h.catalog.resolve("USDC", &eth).unwrap();
    let usdc_poly = h.catalog.resolve("USDC", &polygon).unwrap();
    let usdt_poly = h.catalog.resolve("USDT", &polygon).unwrap();

    h.balances
        .set_balance(SENDER, &usdc_eth, Units::new(500_000_000));
    h.quotes
        .set_bridge_lane(&eth, &polygon, &usdc_eth, Units::new(500_000), 300, true);
    h.quotes.set_swap_rate(
        &usdc_poly,
        &usdt_poly,
        999,
        1000,
        Decimal::from_str("0.001").unwrap(),
    );

    let request = PaymentRequest::new(vec![SENDER.to_string()], RECEIVER, "100", "USDC")
        .with_accept(AcceptTarget::new(137u64, "USDT", RECEIVER));

    h.engine
        .find_best_route(&request)
        .await
        .unwrap()
        .expect("route should exist")
}

#[tokio::test]
async fn test_full_execution_of_discovered_route() {
    let h = harness();
    let route = discover_bridge_route(&h).await;

    // bridge on ethereum, then approve + swap + transfer on polygon
    let kinds: Vec<StepKind> = route.steps.iter().map(|s| s.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            StepKind::Bridge,
            StepKind::Approve,
            StepKind::Swap,
            StepKind::Transfer
        ]
    );

    let report = h.engine.execute_route(&route).await;

    assert!(report.is_complete());
    assert_eq!(report.confirmed_steps(), 4);
    assert!(report.settlement_hash().is_some());
    // bridge submitted on ethereum, the rest on polygon
    assert_eq!(h.eth_provider.submission_count(), 1);
    assert_eq!(h.polygon_provider.submission_count(), 3);
}

#[tokio::test]
async fn test_three_step_partial_failure_names_the_failed_step() {
    let h = harness();
    let route = discover_bridge_route(&h).await;

    // polygon steps: approve succeeds, swap reverts deterministically
    h.polygon_provider.script_submission(Ok("0xapprove".into()));
    h.polygon_provider
        .script_submission(Err(ProviderError::SlippageExceeded));

    let report = h.engine.execute_route(&route).await;

    assert_eq!(
        report.outcome,
        ExecutionOutcome::PartiallyExecuted {
            completed_steps: 2,
            failed_step: 2,
        }
    );
    assert_eq!(report.steps[0].state, StepState::Confirmed);
    assert_eq!(report.steps[1].state, StepState::Confirmed);
    assert_eq!(report.steps[2].state, StepState::Failed);
    // the transfer after the failed swap was never attempted
    assert_eq!(report.steps[3].state, StepState::Pending);
    assert_eq!(report.steps[3].attempts, 0);
}

#[tokio::test]
async fn test_bridge_execution_polls_status_to_confirmation() {
    let h = harness();
    let route = discover_bridge_route(&h).await;

    h.eth_provider.script_submission(Ok("0xbridgetx".into()));
    h.quotes.script_bridge_status(
        "0xbridgetx",
        vec![
            BridgeStatus {
                state: BridgeTxState::Pending,
                confirmations: 0,
                estimated_seconds_remaining: 120,
            },
            BridgeStatus {
                state: BridgeTxState::Pending,
                confirmations: 1,
                estimated_seconds_remaining: 60,
            },
            BridgeStatus {
                state: BridgeTxState::Confirmed,
                confirmations: 3,
                estimated_seconds_remaining: 0,
            },
        ],
    );

    let report = h.engine.execute_route(&route).await;

    assert!(report.is_complete());
    assert_eq!(report.steps[0].kind, StepKind::Bridge);
    assert_eq!(report.steps[0].state, StepState::Confirmed);
    assert_eq!(report.steps[0].tx_hash.as_deref(), Some("0xbridgetx"));
}

#[tokio::test]
async fn test_transient_submission_errors_retried_within_bound() {
    let h = harness();
    let route = discover_bridge_route(&h).await;

    h.eth_provider
        .script_submission(Err(ProviderError::Transient("nonce too low".into())));
    h.eth_provider.script_submission(Ok("0xsecondtry".into()));

    let report = h.engine.execute_route(&route).await;

    assert!(report.is_complete());
    assert_eq!(report.steps[0].attempts, 2);
    assert_eq!(report.steps[0].tx_hash.as_deref(), Some("0xsecondtry"));
}

#[tokio::test]
async fn test_cancelled_execution_never_submits() {
    let h = harness();
    let route = discover_bridge_route(&h).await;

    let cancel = crosspay::CancelToken::new();
    cancel.cancel();

    let report = h.engine.execute_route_with_cancel(&route, &cancel).await;

    assert!(matches!(
        report.outcome,
        ExecutionOutcome::NotStarted { .. }
    ));
    assert_eq!(h.eth_provider.submission_count(), 0);
    assert_eq!(h.polygon_provider.submission_count(), 0);
}

#[tokio::test]
async fn test_execution_report_serializes_with_omitted_fields() {
    let h = harness();
    let route = discover_bridge_route(&h).await;

    h.eth_provider
        .script_submission(Err(ProviderError::Reverted {
            reason: "bridge deposit reverted".into(),
        }));

    let report = h.engine.execute_route(&route).await;
    let json = serde_json::to_value(&report).unwrap();

    // failed first step: error present, no tx hash
    let first = json["steps"][0].as_object().unwrap();
    assert!(first.contains_key("error"));
    assert!(!first.contains_key("txHash"));

    // untouched later step: neither error nor hash
    let last = json["steps"][3].as_object().unwrap();
    assert!(!last.contains_key("error"));
    assert!(!last.contains_key("txHash"));

    assert_eq!(json["outcome"]["status"], "partiallyExecuted");
    assert_eq!(json["outcome"]["completedSteps"], 0);
    assert_eq!(json["outcome"]["failedStep"], 0);
}
