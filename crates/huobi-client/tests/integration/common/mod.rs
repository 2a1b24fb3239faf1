pub mod mock_ws;

use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Poll `condition` every 20ms until it holds or `deadline` passes.
pub async fn wait_until<F>(deadline: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    timeout(deadline, async {
        while !condition() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}
