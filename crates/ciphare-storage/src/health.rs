//! Storage health check

use opendal::Operator;

/// Verify the blob backend is reachable by listing the root
pub async fn check_health(op: &Operator) -> opendal::Result<()> {
    // A listing of the root is the lightest call every backend supports
    op.list("/").await.map(|_| ())
}
