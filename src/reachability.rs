//! Endpoint reachability check
//!
//! Races one TCP connection attempt per endpoint and reports the first that
//! succeeds. The whole check is bounded by a single overall timeout. A failed
//! check is advisory: the target cluster may not exist yet.

use std::fmt;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::endpoint::Endpoint;

/// A successful connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reachable {
    pub endpoint: Endpoint,
    pub elapsed: Duration,
}

/// Why one endpoint could not be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub endpoint: Endpoint,
    pub reason: String,
}

/// No endpoint accepted a connection within the timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreachableError {
    pub timeout: Duration,
    pub failures: Vec<EndpointFailure>,
}

impl fmt::Display for UnreachableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no endpoint reachable within {:?}", self.timeout)?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{} ({})", failure.endpoint, failure.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for UnreachableError {}

/// Attempt a connection to every endpoint in parallel.
///
/// Returns as soon as one attempt succeeds, or once all attempts have failed
/// or `timeout` has elapsed. Endpoints still pending at the deadline are
/// reported as timed out.
pub fn verify_reachability(
    endpoints: &[Endpoint],
    timeout: Duration,
) -> Result<Reachable, UnreachableError> {
    race(endpoints, timeout, dial)
}

/// Run `attempt` against every endpoint on its own thread, bounded by `timeout`
fn race<F>(
    endpoints: &[Endpoint],
    timeout: Duration,
    attempt: F,
) -> Result<Reachable, UnreachableError>
where
    F: Fn(&Endpoint, Instant) -> Result<(), String> + Clone + Send + 'static,
{
    let started = Instant::now();
    let deadline = started + timeout;
    let (tx, rx) = mpsc::channel();

    let mut outcomes: Vec<Option<String>> = vec![None; endpoints.len()];
    let mut pending = 0usize;

    for (idx, endpoint) in endpoints.iter().enumerate() {
        let tx = tx.clone();
        let target = endpoint.clone();
        let attempt = attempt.clone();
        let spawned = thread::Builder::new()
            .name(format!("dial-{idx}"))
            .spawn(move || {
                let outcome = attempt(&target, deadline);
                // receiver is gone once another endpoint won the race
                let _ = tx.send((idx, outcome));
            });
        match spawned {
            Ok(_) => pending += 1,
            Err(e) => outcomes[idx] = Some(format!("failed to spawn dial thread: {e}")),
        }
    }
    drop(tx);

    while pending > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((idx, Ok(()))) => {
                let reachable = Reachable {
                    endpoint: endpoints[idx].clone(),
                    elapsed: started.elapsed(),
                };
                debug!(endpoint = %reachable.endpoint, elapsed = ?reachable.elapsed, "endpoint reachable");
                return Ok(reachable);
            }
            Ok((idx, Err(reason))) => {
                trace!(endpoint = %endpoints[idx], %reason, "dial failed");
                outcomes[idx] = Some(reason);
                pending -= 1;
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let failures = endpoints
        .iter()
        .zip(outcomes)
        .map(|(endpoint, outcome)| EndpointFailure {
            endpoint: endpoint.clone(),
            reason: outcome.unwrap_or_else(|| "timed out".to_string()),
        })
        .collect();

    Err(UnreachableError { timeout, failures })
}

/// Open and immediately close a TCP connection to one endpoint
fn dial(endpoint: &Endpoint, deadline: Instant) -> Result<(), String> {
    let addrs = endpoint
        .authority()
        .to_socket_addrs()
        .map_err(|e| format!("resolve failed: {e}"))?;

    let mut last_error = "no addresses resolved".to_string();
    for addr in addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err("timed out".to_string());
        }
        match TcpStream::connect_timeout(&addr, remaining) {
            Ok(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
                return Ok(());
            }
            Err(e) => last_error = format!("{addr}: {e}"),
        }
    }
    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn closed_port_endpoint() -> Endpoint {
        // bind then drop so nothing is listening on the port
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn test_reachable_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint: Endpoint = listener.local_addr().unwrap().to_string().parse().unwrap();

        let reachable = verify_reachability(&[endpoint.clone()], Duration::from_secs(2)).unwrap();
        assert_eq!(reachable.endpoint, endpoint);
    }

    #[test]
    fn test_one_of_many_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let live: Endpoint = listener.local_addr().unwrap().to_string().parse().unwrap();
        let dead = closed_port_endpoint();

        let reachable =
            verify_reachability(&[dead, live.clone()], Duration::from_secs(2)).unwrap();
        assert_eq!(reachable.endpoint, live);
    }

    #[test]
    fn test_all_unreachable_lists_failures() {
        let a = closed_port_endpoint();
        let b = closed_port_endpoint();

        let err = verify_reachability(&[a.clone(), b.clone()], Duration::from_secs(2)).unwrap_err();
        assert_eq!(err.failures.len(), 2);
        assert_eq!(err.failures[0].endpoint, a);
        assert_eq!(err.failures[1].endpoint, b);
        assert!(err.to_string().starts_with("no endpoint reachable"));
    }

    #[test]
    fn test_deadline_reports_pending_as_timed_out() {
        let slow: Endpoint = "10.0.0.1:2379".parse().unwrap();
        let fast: Endpoint = "10.0.0.2:2379".parse().unwrap();
        let slow_host = slow.host().to_string();

        let started = Instant::now();
        let attempt = move |ep: &Endpoint, _: Instant| {
            if ep.host() == slow_host {
                thread::sleep(Duration::from_secs(3));
                Ok(())
            } else {
                Err("refused".to_string())
            }
        };
        let err = race(&[slow.clone(), fast.clone()], Duration::from_millis(100), attempt)
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(err.failures[0].endpoint, slow);
        assert_eq!(err.failures[0].reason, "timed out");
        assert_eq!(err.failures[1].endpoint, fast);
        assert_eq!(err.failures[1].reason, "refused");
    }

    #[test]
    fn test_success_after_failures_within_deadline() {
        let endpoints: Vec<Endpoint> = vec!["a:1".parse().unwrap(), "b:2".parse().unwrap()];

        let reachable = race(&endpoints, Duration::from_secs(2), |ep, _| {
            if ep.host() == "b" {
                thread::sleep(Duration::from_millis(20));
                Ok(())
            } else {
                Err("refused".to_string())
            }
        })
        .unwrap();
        assert_eq!(reachable.endpoint, endpoints[1]);
    }

    #[test]
    fn test_no_endpoints() {
        let err = verify_reachability(&[], Duration::from_millis(10)).unwrap_err();
        assert!(err.failures.is_empty());
    }

    #[test]
    fn test_display_format() {
        let err = UnreachableError {
            timeout: Duration::from_secs(5),
            failures: vec![
                EndpointFailure {
                    endpoint: "a:1".parse().unwrap(),
                    reason: "refused".to_string(),
                },
                EndpointFailure {
                    endpoint: "b:2".parse().unwrap(),
                    reason: "timed out".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "no endpoint reachable within 5s: a:1 (refused); b:2 (timed out)"
        );
    }
}
