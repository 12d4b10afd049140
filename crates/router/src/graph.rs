use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

use crosspay_gateway::{BridgeQuote, GatewayError, QuoteGateway, SwapQuote, TokenCatalog};
use crosspay_types::{ChainId, TokenInfo, Units};

/// Branching and depth policy for the graph walk.
///
/// The defaults (2 swap edges, 2 bridge edges) are the design contract:
/// real liquidity degrades sharply beyond a couple of hops, and the token
/// graph has cycles, so the walk must be bounded up front.
#[derive(Clone, Copy, Debug)]
pub struct SearchPolicy {
    pub max_swap_hops: u32,
    pub max_bridge_hops: u32,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            max_swap_hops: 2,
            max_bridge_hops: 2,
        }
    }
}

/// One candidate funding holding: an address's balance of the request token
/// on one chain, with the amount the route would spend.
#[derive(Clone, Debug)]
pub struct CandidateSource {
    pub address: String,
    pub token: TokenInfo,
    pub balance: Units,
    /// Request amount in this holding's base units
    pub amount_in: Units,
}

/// An accept tuple resolved against the token catalog
#[derive(Clone, Debug)]
pub struct ResolvedTarget {
    pub chain: ChainId,
    pub token: TokenInfo,
    pub receiver: String,
}

/// A priced edge in a candidate path
#[derive(Clone, Debug)]
pub enum PlannedHop {
    Swap {
        chain: ChainId,
        from: TokenInfo,
        to: TokenInfo,
        amount_in: Units,
        quote: SwapQuote,
        quoted_at: u64,
    },
    Bridge {
        from_chain: ChainId,
        to_chain: ChainId,
        from_token: TokenInfo,
        to_token: TokenInfo,
        amount_in: Units,
        quote: BridgeQuote,
    },
    Transfer {
        chain: ChainId,
        token: TokenInfo,
        to: String,
        amount: Units,
    },
}

/// A complete priced path from a source holding to an accept target
#[derive(Clone, Debug)]
pub struct CandidatePath {
    pub source: CandidateSource,
    pub target: ResolvedTarget,
    pub hops: Vec<PlannedHop>,
    pub amount_out: Units,
    /// Emission order within this source's walk; final ranking tie-break
    pub discovery_order: usize,
}

/// Result of one source's graph walk, with the edge accounting the finder
/// uses to tell "no liquidity" from "gateway down".
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub paths: Vec<CandidatePath>,
    /// Quote calls attempted
    pub edges_priced: u32,
    /// Quote calls that failed with a network/timeout error
    pub gateway_errors: u32,
}

struct WalkNode {
    chain: ChainId,
    token: TokenInfo,
    amount: Units,
    swaps_used: u32,
    bridges_used: u32,
    /// (chain, address key) pairs already on this path; cycle exclusion
    visited: Vec<(ChainId, String)>,
    hops: Vec<PlannedHop>,
}

/// Expands one candidate source into zero or more priced paths.
///
/// Nodes are `(chain, token)` pairs. Per hop the builder generates swap
/// edges (same chain, target token or a catalog intermediate) and bridge
/// edges (same token symbol, a chain named by a target). Every edge is
/// priced through the quote gateway as it is generated; a failed quote
/// drops the edge and the walk continues.
pub struct RouteGraphBuilder {
    catalog: Arc<TokenCatalog>,
    quotes: Arc<dyn QuoteGateway>,
    policy: SearchPolicy,
}

impl RouteGraphBuilder {
    pub fn new(
        catalog: Arc<TokenCatalog>,
        quotes: Arc<dyn QuoteGateway>,
        policy: SearchPolicy,
    ) -> Self {
        Self {
            catalog,
            quotes,
            policy,
        }
    }

    /// Walk the graph from `source` toward `targets`.
    ///
    /// Returns an empty path set when nothing reaches a target within the
    /// hop bounds; that is a normal outcome, not an error.
    pub async fn build(
        &self,
        source: &CandidateSource,
        targets: &[ResolvedTarget],
    ) -> BuildOutcome {
        let mut outcome = BuildOutcome::default();

        let root = WalkNode {
            chain: source.token.chain_id.clone(),
            token: source.token.clone(),
            amount: source.amount_in,
            swaps_used: 0,
            bridges_used: 0,
            visited: vec![(source.token.chain_id.clone(), source.token.address_key())],
            hops: Vec::new(),
        };

        self.explore(source, targets, root, &mut outcome).await;

        debug!(
            address = %source.address,
            chain = %source.token.chain_id,
            token = %source.token.symbol,
            paths = outcome.paths.len(),
            edges_priced = outcome.edges_priced,
            gateway_errors = outcome.gateway_errors,
            "graph walk finished"
        );

        outcome
    }

    fn explore<'a>(
        &'a self,
        source: &'a CandidateSource,
        targets: &'a [ResolvedTarget],
        node: WalkNode,
        outcome: &'a mut BuildOutcome,
    ) -> BoxFuture<'a, ()> {
        async move {
            // Emit before expanding so the zero-hop transfer is always
            // attempted when the source already matches a target.
            for target in targets {
                if target.chain == node.chain && target.token.same_asset(&node.token) {
                    let mut hops = node.hops.clone();
                    hops.push(PlannedHop::Transfer {
                        chain: node.chain.clone(),
                        token: node.token.clone(),
                        to: target.receiver.clone(),
                        amount: node.amount,
                    });
                    outcome.paths.push(CandidatePath {
                        source: source.clone(),
                        target: target.clone(),
                        hops,
                        amount_out: node.amount,
                        discovery_order: outcome.paths.len(),
                    });
                }
            }

            if node.amount.is_zero() {
                return;
            }

            if node.swaps_used < self.policy.max_swap_hops {
                for next in self.swap_candidates(&node, targets) {
                    outcome.edges_priced += 1;
                    match self
                        .quotes
                        .swap_quote(&node.chain, &node.token, &next, node.amount)
                        .await
                    {
                        Ok(quote) => {
                            let mut hops = node.hops.clone();
                            hops.push(PlannedHop::Swap {
                                chain: node.chain.clone(),
                                from: node.token.clone(),
                                to: next.clone(),
                                amount_in: node.amount,
                                quote: quote.clone(),
                                quoted_at: now_unix(),
                            });
                            let mut visited = node.visited.clone();
                            visited.push((node.chain.clone(), next.address_key()));
                            self.explore(
                                source,
                                targets,
                                WalkNode {
                                    chain: node.chain.clone(),
                                    token: next,
                                    amount: quote.expected_output,
                                    swaps_used: node.swaps_used + 1,
                                    bridges_used: node.bridges_used,
                                    visited,
                                    hops,
                                },
                                outcome,
                            )
                            .await;
                        }
                        Err(e) => {
                            if is_gateway_fault(&e) {
                                outcome.gateway_errors += 1;
                            }
                            trace!(
                                chain = %node.chain,
                                from = %node.token.symbol,
                                to = %next.symbol,
                                error = %e,
                                "swap edge dropped"
                            );
                        }
                    }
                }
            }

            if node.bridges_used < self.policy.max_bridge_hops {
                for (dest_chain, dest_token) in self.bridge_candidates(&node, targets) {
                    outcome.edges_priced += 1;
                    match self
                        .quotes
                        .bridge_quote(&node.chain, &dest_chain, &node.token, node.amount)
                        .await
                    {
                        Ok(quote) => {
                            let Some(landed) = bridge_output(
                                node.amount,
                                quote.fee,
                                node.token.decimals,
                                dest_token.decimals,
                            ) else {
                                trace!(
                                    from_chain = %node.chain,
                                    to_chain = %dest_chain,
                                    "bridge fee exceeds amount, edge dropped"
                                );
                                continue;
                            };

                            let mut hops = node.hops.clone();
                            hops.push(PlannedHop::Bridge {
                                from_chain: node.chain.clone(),
                                to_chain: dest_chain.clone(),
                                from_token: node.token.clone(),
                                to_token: dest_token.clone(),
                                amount_in: node.amount,
                                quote,
                            });
                            let mut visited = node.visited.clone();
                            visited.push((dest_chain.clone(), dest_token.address_key()));
                            self.explore(
                                source,
                                targets,
                                WalkNode {
                                    chain: dest_chain,
                                    token: dest_token,
                                    amount: landed,
                                    swaps_used: node.swaps_used,
                                    bridges_used: node.bridges_used + 1,
                                    visited,
                                    hops,
                                },
                                outcome,
                            )
                            .await;
                        }
                        Err(e) => {
                            if is_gateway_fault(&e) {
                                outcome.gateway_errors += 1;
                            }
                            trace!(
                                from_chain = %node.chain,
                                to_chain = %dest_chain,
                                error = %e,
                                "bridge edge dropped"
                            );
                        }
                    }
                }
            }
        }
        .boxed()
    }

    /// Swap destinations on the current chain: the targets' tokens plus the
    /// catalog's bridging-liquid intermediates, minus anything already on
    /// the path. The allow-list keeps the branching factor bounded.
    fn swap_candidates(&self, node: &WalkNode, targets: &[ResolvedTarget]) -> Vec<TokenInfo> {
        let mut candidates: Vec<TokenInfo> = Vec::new();

        for target in targets {
            if target.chain == node.chain {
                candidates.push(target.token.clone());
            }
        }
        candidates.extend(self.catalog.bridge_intermediates(&node.chain));

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|c| {
            !c.same_asset(&node.token)
                && !node
                    .visited
                    .contains(&(node.chain.clone(), c.address_key()))
                && seen.insert(c.address_key())
        });
        candidates
    }

    /// Bridge destinations: chains named by the targets, carrying the same
    /// token symbol, excluding nodes already on the path.
    fn bridge_candidates(
        &self,
        node: &WalkNode,
        targets: &[ResolvedTarget],
    ) -> Vec<(ChainId, TokenInfo)> {
        let mut destinations: Vec<(ChainId, TokenInfo)> = Vec::new();

        for target in targets {
            if target.chain == node.chain {
                continue;
            }
            if destinations.iter().any(|(c, _)| *c == target.chain) {
                continue;
            }
            let Some(dest_token) = self.catalog.resolve(&node.token.symbol, &target.chain) else {
                continue;
            };
            if node
                .visited
                .contains(&(target.chain.clone(), dest_token.address_key()))
            {
                continue;
            }
            destinations.push((target.chain.clone(), dest_token));
        }

        destinations
    }
}

/// Deduct the bridge fee, then rescale between decimals if the token uses a
/// different precision on the destination chain.
fn bridge_output(
    amount: Units,
    fee: Units,
    from_decimals: u8,
    to_decimals: u8,
) -> Option<Units> {
    let after_fee = amount.checked_sub(fee)?;
    if after_fee.is_zero() {
        return None;
    }

    let rescaled = match from_decimals.cmp(&to_decimals) {
        std::cmp::Ordering::Equal => after_fee,
        std::cmp::Ordering::Less => {
            let factor = 10u128.checked_pow((to_decimals - from_decimals) as u32)?;
            Units::new(after_fee.value().checked_mul(factor)?)
        }
        std::cmp::Ordering::Greater => {
            let factor = 10u128.checked_pow((from_decimals - to_decimals) as u32)?;
            Units::new(after_fee.value() / factor)
        }
    };

    (!rescaled.is_zero()).then_some(rescaled)
}

/// Network-level faults count toward gateway-health accounting; a missing
/// pair or lane is just an absent edge.
fn is_gateway_fault(error: &GatewayError) -> bool {
    matches!(
        error,
        GatewayError::Network(_) | GatewayError::Timeout { .. }
    )
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
