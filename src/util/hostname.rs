use url::Url;

/// Derives the short source label used to tag item titles.
///
/// Returns the host of `raw_url` as written, with its port when one is given.
/// Anything that does not parse as an absolute URL with a host comes back
/// unchanged, so a label is always available.
///
/// # Examples
///
/// ```
/// use combine_rss_feeds::util::hostname;
///
/// assert_eq!(hostname("https://zenn.dev/kotaoue/feed"), "zenn.dev");
/// assert_eq!(hostname("https://example.com:443/feed"), "example.com:443");
/// assert_eq!(hostname("not-a-url"), "not-a-url");
/// ```
pub fn hostname(raw_url: &str) -> String {
    let has_host = Url::parse(raw_url)
        .map(|url| url.host_str().is_some_and(|host| !host.is_empty()))
        .unwrap_or(false);
    if !has_host {
        return raw_url.to_owned();
    }

    authority_host(raw_url).unwrap_or(raw_url).to_owned()
}

/// `host[:port]` from the authority of `scheme://[userinfo@]host[:port]/...`,
/// without normalizing case or dropping default ports.
fn authority_host(raw_url: &str) -> Option<&str> {
    let (_, rest) = raw_url.trim().split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    (!host.is_empty()).then_some(host)
}
