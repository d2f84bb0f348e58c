//! Construct a limiter that admits 20 requests per second in total, split
//! between a "reads" group (15/s) and a "writes" group (5/s).
//! Repeatedly submit a request for a random group.

use group_rate_limiter::{CancellationToken, GroupLimiter, GroupRatesConfig, LimiterOptions};

use rand::{thread_rng, Rng};
use tokio::time::Instant;

#[tokio::main]
async fn main() -> Result<(), group_rate_limiter::Error> {
    let config = GroupRatesConfig::new(20).group("reads", 15).group("writes", 5);
    let limiter = GroupLimiter::from_config(&config, LimiterOptions::new())?;
    let cancel = CancellationToken::new();

    let start = Instant::now();

    let mut rng = thread_rng();

    loop {
        let group = if rng.gen_bool(0.75) { "reads" } else { "writes" };
        let admitted = limiter.take(&cancel, group).await;
        println!("Admitted {} at {:?}", group, admitted - start);
    }
}
