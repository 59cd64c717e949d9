use std::time::Duration;

use crate::{Error, Result};

/// How long key generation waits for Paillier pre-parameters before
/// giving up.
///
/// Matches the original coordinator's `GeneratePreParams(10 * time.Minute)`
/// call: pre-parameter generation involves finding two safe primes and
/// can occasionally run long on slow hardware, but a session that can't
/// produce them in ten minutes is not going to succeed at all.
pub const PRE_PARAMS_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Alias kept for callers that only need a name for "whatever
/// pre-parameters the keygen driver produced"; the concrete type lives
/// behind the `gg20` feature.
pub type PreParams = Vec<u8>;

/// Run `generate` (a CPU-bound safe-prime search) on a blocking thread,
/// bounded by [`PRE_PARAMS_TIMEOUT`].
///
/// Safe-prime search must not run on the async executor's worker
/// threads, so it is spawned via [`tokio::task::spawn_blocking`] and
/// raced against the timeout rather than awaited directly.
pub async fn generate_pre_params<F, T>(generate: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(generate);
    match tokio::time::timeout(PRE_PARAMS_TIMEOUT, handle).await {
        Ok(Ok(params)) => Ok(params),
        Ok(Err(join_err)) => Err(Error::Proceed(format!(
            "pre-params task panicked: {join_err}"
        ))),
        Err(_) => Err(Error::PreParamsTimeout(PRE_PARAMS_TIMEOUT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_the_generated_value() {
        let value = generate_pre_params(|| 42u32).await.unwrap();
        assert_eq!(value, 42);
    }
}
