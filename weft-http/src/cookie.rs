use jiff::Timestamp;
use jiff::civil;
use jiff::tz::TimeZone;
use weft_net::{HeaderConsumer, HeaderField, ParseMode, Url};

/// An HTTP cookie, as stored in a jar.
///
/// Cookies are created from `Set-Cookie` header fields together with
/// the request URL they arrived on ([`Cookie::from_response`]), or
/// loaded from a Netscape-style `cookies.txt` line
/// ([`Cookie::parse_line`]). Identity for replacement purposes is the
/// (host, path, name) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    sequence_number: u32,
    host: String,
    host_domain_match: bool,
    path: String,
    secure: bool,
    expires: Timestamp,
    name: String,
    value: String,
    persistent: bool,
}

impl Default for Cookie {
    fn default() -> Self {
        Self {
            sequence_number: 0,
            host: String::new(),
            host_domain_match: false,
            path: String::new(),
            secure: false,
            expires: Timestamp::UNIX_EPOCH,
            name: String::new(),
            value: String::new(),
            persistent: false,
        }
    }
}

impl Cookie {
    /// Build a cookie from one `Set-Cookie` field.
    ///
    /// `url` is the request URL the response belongs to: it provides
    /// the default host and the default path (the directory of the
    /// request path). `now` anchors `Max-Age`. Attributes are parsed
    /// with quote and comment processing disabled, as RFC 6265 wants;
    /// `Max-Age` beats `Expires` regardless of order; unknown
    /// attributes are ignored.
    #[must_use]
    pub fn from_response(url: &Url, now: Timestamp, field: &HeaderField) -> Self {
        let mode = ParseMode::new().without_comments().without_quotes();
        let mut cookie = Self {
            host: url.host.clone(),
            path: base_path(&url.path),
            name: field.name().to_string(),
            value: field.primary_value(mode),
            ..Self::default()
        };

        let mut attributes = AttributeParser {
            cookie: &mut cookie,
            now,
            had_max_age: false,
        };
        field.enumerate_secondary_values(&mut attributes, mode);

        // Some servers leak "host:port" into the Domain attribute;
        // drop the port. "]" guards bracketless IPv6 hosts.
        if let Some(pos) = cookie.host.rfind([':', ']']) {
            if cookie.host.as_bytes()[pos] == b':' {
                cookie.host.truncate(pos);
            }
        }
        cookie
    }

    /// Cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Host (or domain) the cookie belongs to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path the cookie is scoped to.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the cookie is restricted to `https` requests.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Whether the cookie outlives the session (has an expiry).
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Expiration time; meaningful only for persistent cookies.
    #[must_use]
    pub fn expires(&self) -> Timestamp {
        self.expires
    }

    /// Jar-assigned insertion number, for age ordering on the wire.
    #[must_use]
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Assign the jar's insertion number.
    pub fn set_sequence_number(&mut self, sequence_number: u32) {
        self.sequence_number = sequence_number;
    }

    /// A usable cookie has a name, a host, and an absolute path.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && !self.host.is_empty()
            && self.path.starts_with('/')
    }

    /// Whether the cookie has expired; only persistent cookies can.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.persistent && self.expires <= now
    }

    /// Whether this cookie applies to a request for `url`.
    #[must_use]
    pub fn matches_url(&self, url: &Url) -> bool {
        match_host(&url.host, &self.host, self.host_domain_match)
            && match_cookie_path(&base_path(&url.path), &self.path)
            && (!self.secure || url.scheme == "https")
    }

    /// Whether `other` names the same cookie (same host, path, name).
    #[must_use]
    pub fn matches_cookie(&self, other: &Self) -> bool {
        self.host == other.host && self.path == other.path && self.name == other.name
    }

    /// Parse one `cookies.txt` line.
    ///
    /// Comment lines, short lines, bad booleans, and out-of-range
    /// expiry values are all rejected with `None`. Cookies from disk
    /// are persistent by definition.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let mut fields = line.split('\t');
        let cookie = Self {
            host: fields.next()?.to_string(),
            host_domain_match: parse_bool(fields.next()?)?,
            path: fields.next()?.to_string(),
            secure: parse_bool(fields.next()?)?,
            expires: parse_expiry(fields.next()?)?,
            name: fields.next()?.to_string(),
            value: fields.next()?.to_string(),
            persistent: true,
            sequence_number: 0,
        };
        cookie.is_valid().then_some(cookie)
    }

    /// Render the cookie as one `cookies.txt` line.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.host,
            flag(self.host_domain_match),
            self.path,
            flag(self.secure),
            self.expires.as_second(),
            self.name,
            self.value,
        )
    }
}

fn flag(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

fn parse_bool(field: &str) -> Option<bool> {
    if field.eq_ignore_ascii_case("TRUE") {
        Some(true)
    } else if field.eq_ignore_ascii_case("FALSE") {
        Some(false)
    } else {
        None
    }
}

fn parse_expiry(field: &str) -> Option<Timestamp> {
    let seconds: i64 = field.parse().ok()?;
    // Refuse obvious garbage; 2^40 seconds is some 34000 years out.
    if !(0..=1 << 40).contains(&seconds) {
        return None;
    }
    Timestamp::from_second(seconds).ok()
}

fn timestamp_from_unix(seconds: i64) -> Timestamp {
    let clamped = seconds.clamp(Timestamp::MIN.as_second(), Timestamp::MAX.as_second());
    Timestamp::from_second(clamped).unwrap_or(Timestamp::UNIX_EPOCH)
}

/// Applies `Set-Cookie` attributes onto the cookie under construction.
struct AttributeParser<'a> {
    cookie: &'a mut Cookie,
    now: Timestamp,
    had_max_age: bool,
}

impl HeaderConsumer for AttributeParser<'_> {
    fn handle_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("expires") {
            // Textual expiration date; defers to Max-Age.
            if !self.had_max_age {
                if let Some(expires) = parse_cookie_date(value) {
                    self.cookie.expires = expires;
                    self.cookie.persistent = true;
                }
            }
        } else if name.eq_ignore_ascii_case("max-age") {
            if !self.had_max_age {
                if let Ok(seconds) = value.trim().parse::<i64>() {
                    self.cookie.expires =
                        timestamp_from_unix(self.now.as_second().saturating_add(seconds));
                    self.had_max_age = true;
                    self.cookie.persistent = true;
                }
            }
        } else if name.eq_ignore_ascii_case("domain") {
            if !value.is_empty() {
                self.cookie.host = value.to_ascii_lowercase();
                self.cookie.host_domain_match = true;
            }
        } else if name.eq_ignore_ascii_case("path") {
            if value.starts_with('/') {
                self.cookie.path = value.to_string();
            }
        } else if name.eq_ignore_ascii_case("secure") {
            self.cookie.secure = true;
        } else {
            // Ignored: httponly (RFC 6265); comment, commenturl, port,
            // version (RFC 2965).
        }
    }
}

/// The default cookie path for a request path (RFC 6265 5.1.4): the
/// directory portion, which is either `/` or does not end in `/`.
fn base_path(path: &str) -> String {
    let path = path.find('?').map_or(path, |q| &path[..q]);
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(p) => path[..p].to_string(),
        None => path.to_string(),
    }
}

fn match_host(user_host: &str, cookie_host: &str, domain_match: bool) -> bool {
    if user_host == cookie_host {
        true
    } else if user_host.len() > cookie_host.len() {
        // Suffix match, allowed only when the Domain attribute was
        // given, never against an IP literal, and only on a label
        // boundary.
        domain_match
            && !user_host.contains(':')
            && user_host.bytes().any(|b| !b.is_ascii_digit() && b != b'.')
            && user_host.ends_with(cookie_host)
            && (cookie_host.starts_with('.')
                || user_host.as_bytes()[user_host.len() - cookie_host.len() - 1] == b'.')
    } else {
        false
    }
}

fn match_cookie_path(user_path: &str, cookie_path: &str) -> bool {
    if user_path.len() < cookie_path.len() {
        // Not in the RFC: a cookie placed on "/foo/" via a Path
        // attribute still matches a request for "/foo/", whose implied
        // path is "/foo".
        user_path.len() + 1 == cookie_path.len()
            && cookie_path.starts_with(user_path)
            && cookie_path.ends_with('/')
    } else if !user_path.starts_with(cookie_path) {
        false
    } else if user_path.len() == cookie_path.len() {
        true
    } else if cookie_path.ends_with('/') {
        true
    } else {
        user_path.as_bytes()[cookie_path.len()] == b'/'
    }
}

/*
 * RFC 6265 5.1.1 date parsing
 */

fn is_delimiter(byte: u8) -> bool {
    matches!(byte, 0x09 | 0x20..=0x2F | 0x3B..=0x40 | 0x5B..=0x60 | 0x7B..=0x7E)
}

/// Read 1-2 (or up to `max`) leading digits; more than `max` rejects.
fn parse_digits(bytes: &[u8], pos: &mut usize, min: usize, max: usize) -> Option<u16> {
    let mut count = 0;
    let mut value: u16 = 0;
    while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
        count += 1;
        if count > max {
            return None;
        }
        value = value * 10 + u16::from(bytes[*pos] - b'0');
        *pos += 1;
    }
    (count >= min).then_some(value)
}

fn parse_time_token(token: &str) -> Option<(u16, u16, u16)> {
    // hms-time = time-field ":" time-field ":" time-field
    let bytes = token.as_bytes();
    let mut pos = 0;
    let hour = parse_digits(bytes, &mut pos, 1, 2)?;
    if bytes.get(pos) != Some(&b':') {
        return None;
    }
    pos += 1;
    let minute = parse_digits(bytes, &mut pos, 1, 2)?;
    if bytes.get(pos) != Some(&b':') {
        return None;
    }
    pos += 1;
    let second = parse_digits(bytes, &mut pos, 1, 2)?;
    Some((hour, minute, second))
}

fn parse_month_token(token: &str) -> Option<u16> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix = token.get(..3)?;
    MONTHS
        .iter()
        .position(|month| prefix.eq_ignore_ascii_case(month))
        .map(|index| index as u16 + 1)
}

/// Parse a cookie `Expires` date per the RFC 6265 5.1.1 algorithm.
///
/// The value is split into tokens on the RFC's delimiter class; in
/// token order, the first token matching each of time, day-of-month,
/// month and year fills that slot. Two-digit years are windowed into
/// 1970–2069. Out-of-range fields and impossible dates reject.
fn parse_cookie_date(value: &str) -> Option<Timestamp> {
    let mut time = None;
    let mut day = None;
    let mut month = None;
    let mut year = None;

    for token in value
        .as_bytes()
        .split(|&b| is_delimiter(b))
        .filter(|t| !t.is_empty())
    {
        let token = std::str::from_utf8(token).ok()?;
        if time.is_none() && parse_time_token(token).is_some() {
            time = parse_time_token(token);
        } else if day.is_none()
            && parse_digits(token.as_bytes(), &mut 0, 1, 2).is_some()
        {
            day = parse_digits(token.as_bytes(), &mut 0, 1, 2);
        } else if month.is_none() && parse_month_token(token).is_some() {
            month = parse_month_token(token);
        } else if year.is_none()
            && parse_digits(token.as_bytes(), &mut 0, 2, 4).is_some()
        {
            year = parse_digits(token.as_bytes(), &mut 0, 2, 4);
        }
    }

    let (hour, minute, second) = time?;
    let day = day?;
    let month = month?;
    let mut year = year?;

    if year < 100 {
        year += if year < 70 { 2000 } else { 1900 };
    }
    if !(1..=31).contains(&day) || year < 1601 || hour > 23 || minute > 59 || second > 59 {
        return None;
    }

    let date = civil::Date::new(year as i16, month as i8, day as i8).ok()?;
    let clock = civil::Time::new(hour as i8, minute as i8, second as i8, 0).ok()?;
    let zoned = date.to_datetime(clock).to_zoned(TimeZone::UTC).ok()?;
    Some(zoned.timestamp())
}
