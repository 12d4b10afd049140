use thiserror::Error;

/// Discovery failures that reach the caller.
///
/// "No route found" is never an error: infeasible-but-well-formed requests
/// produce an empty route list. These variants cover the two conditions the
/// caller must distinguish from missing liquidity.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The request cannot be interpreted at all
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Every external gateway failed; the system is misconfigured or down,
    /// which must not be reported as "no liquidity"
    #[error("no working gateway: {reason}")]
    GatewayUnavailable { reason: String },
}
