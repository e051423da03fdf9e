use super::plan::FetchTarget;
use crate::config::SpiderConfig;
use crate::error::{SpiderError, SpiderResult};
use crate::http::*;
use futures::{stream, Future, StreamExt};
use rand::Rng;
use reqwest::header::{REFERER, USER_AGENT};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, trace};
use url::Url;

/// Upper bound on targets being fetched *or* handled at once; fetching itself is further
/// limited by [`DomainLimit::parallelism`].
const MAX_CONCURRENT_TARGETS: usize = 16;

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Pacing for every host matching `glob`.
#[derive(Clone, Debug)]
pub struct DomainLimit {
    pub glob: String,
    /// Requests in flight at once against matching hosts.
    pub parallelism: usize,
    /// Every dispatch after the first waits a random duration in `[0, random_delay)`.
    pub random_delay: Duration,
}

/// `*` matches any run of characters (including none); everything else is literal.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|c| *c == '*')
}

/// Issues the `getByDate` requests for a batch of targets.
pub struct Fetcher {
    client: HttpClient,
    base_url: String,
    allowed_domain: String,
    limit: DomainLimit,
    timeout: Duration,
    slots: Semaphore,
}

impl Fetcher {
    pub fn new(config: &SpiderConfig) -> SpiderResult<Self> {
        let client = reqwest::ClientBuilder::new().build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            allowed_domain: config.allowed_domain.to_lowercase(),
            limit: config.limit.clone(),
            timeout: config.request_timeout,
            slots: Semaphore::new(config.limit.parallelism.max(1)),
        })
    }

    pub fn url(&self, target: &FetchTarget) -> String {
        format!(
            "{base}/api/dividends/getByDate/?name={date}&country={country}",
            base = self.base_url,
            date = target.date.format("%Y-%m-%d"),
            country = target.country,
        )
    }

    /// Fetch every target and hand each outcome to `on_response`, together with the target it
    /// belongs to. Failures are reported per target and never stop the batch; this returns
    /// once every target has completed.
    pub async fn fetch_all<F, Fut>(&self, targets: Vec<FetchTarget>, on_response: F)
    where
        F: Fn(FetchTarget, SpiderResult<Vec<u8>>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let dispatched = AtomicUsize::new(0);
        let concurrency = MAX_CONCURRENT_TARGETS.max(self.limit.parallelism);

        stream::iter(targets)
            .for_each_concurrent(concurrency, |target| {
                let dispatched = &dispatched;
                let on_response = &on_response;
                async move {
                    let result = self.fetch_one(&target, dispatched).await;
                    if let Err(err) = &result {
                        error!(
                            country = %target.country,
                            date = %target.date,
                            url = %self.url(&target),
                            error = %err,
                            "failed to request url"
                        );
                    }
                    on_response(target, result).await;
                }
            })
            .await;
    }

    async fn fetch_one(
        &self,
        target: &FetchTarget,
        dispatched: &AtomicUsize,
    ) -> SpiderResult<Vec<u8>> {
        let url = self.url(target);
        let host = Url::parse(&url)?
            .host_str()
            .map(str::to_lowercase)
            .unwrap_or_default();
        if host != self.allowed_domain {
            return Err(SpiderError::DisallowedDomain(host));
        }

        // hold a slot for the whole request when the host is rate limited
        let _permit = if glob_match(&self.limit.glob, &host) {
            let permit = self
                .slots
                .acquire()
                .await
                .map_err(|err| SpiderError::Config(format!("limiter closed: {err}")))?;

            if dispatched.fetch_add(1, Ordering::SeqCst) > 0 && !self.limit.random_delay.is_zero()
            {
                let delay = random_delay(self.limit.random_delay);
                trace!("delaying {url} by {delay:?}");
                tokio::time::sleep(delay).await;
            }
            Some(permit)
        } else {
            None
        };

        debug!(country = %target.country, date = %target.date, url = %url, "scraping TipRank dividend");
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header(USER_AGENT, random_user_agent())
            .header(REFERER, format!("{}/", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SpiderError::HttpStatus {
                status: response.status().to_string(),
                url,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

fn random_delay(bound: Duration) -> Duration {
    let millis = bound.as_millis().max(1) as u64;
    Duration::from_millis(rand::thread_rng().gen_range(0..millis))
}

fn random_user_agent() -> &'static str {
    USER_AGENTS[rand::thread_rng().gen_range(0..USER_AGENTS.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn globs() {
        assert!(glob_match("*tipranks.*", "www.tipranks.com"));
        assert!(glob_match("*tipranks.*", "tipranks.co.uk"));
        assert!(!glob_match("*tipranks.*", "www.example.com"));
        assert!(!glob_match("*tipranks.*", "tipranks"));
        assert!(glob_match("*", ""));
        assert!(glob_match("127.0.0.*", "127.0.0.1"));
        assert!(glob_match("a*b*c", "aXXbYYbc"));
        assert!(!glob_match("a*b*c", "aXXbYY"));
    }

    #[test]
    fn url_template() {
        let fetcher = Fetcher::new(&SpiderConfig::default()).unwrap();
        let target = FetchTarget {
            country: "Canada".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };
        assert_eq!(
            fetcher.url(&target),
            "https://www.tipranks.com/api/dividends/getByDate/?name=2024-01-05&country=Canada"
        );
    }

    #[tokio::test]
    async fn first_dispatch_is_not_delayed() {
        // a port nothing listens on; the request fails fast with a refused connection
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = SpiderConfig {
            base_url: format!("http://127.0.0.1:{port}"),
            allowed_domain: "127.0.0.1".to_string(),
            limit: DomainLimit {
                glob: "127.0.0.*".to_string(),
                parallelism: 1,
                random_delay: Duration::from_secs(60),
            },
            request_timeout: Duration::from_secs(1),
            countries: vec![],
        };
        let fetcher = Fetcher::new(&config).unwrap();
        let target = FetchTarget {
            country: "US".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };

        let time = std::time::Instant::now();
        let results = std::sync::Mutex::new(Vec::new());
        fetcher
            .fetch_all(vec![target], |_, result| {
                results.lock().unwrap().push(result.is_err());
                async {}
            })
            .await;

        assert!(time.elapsed() < Duration::from_secs(2));
        assert_eq!(*results.lock().unwrap(), vec![true]);
    }

    #[test]
    fn delays_stay_in_bounds() {
        for _ in 0..100 {
            assert!(random_delay(Duration::from_millis(50)) < Duration::from_millis(50));
        }
    }
}
