use std::io::{self, BufRead, Write};

use jiff::Timestamp;
use parking_lot::Mutex;
use weft_net::{HeaderConsumer, HeaderTable, Url};

use crate::Cookie;

/// A thread-safe collection of cookies.
///
/// The jar owns its cookies; a cookie with the same (host, path, name)
/// identity replaces the stored one. Every public operation takes the
/// internal lock for its whole duration, so the jar can be shared
/// freely between a client loop and whatever else manages it.
#[derive(Default)]
pub struct CookieJar {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    cookies: Vec<Cookie>,
    counter: u32,
}

impl Inner {
    fn add(&mut self, mut cookie: Cookie) {
        self.counter = self.counter.wrapping_add(1);
        cookie.set_sequence_number(self.counter);
        match self.cookies.iter().position(|c| c.matches_cookie(&cookie)) {
            Some(index) => self.cookies[index] = cookie,
            None => self.cookies.push(cookie),
        }
    }
}

impl CookieJar {
    /// Create an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cookie, replacing any stored cookie with the same
    /// identity. The jar assigns the sequence number.
    pub fn add_cookie(&self, cookie: Cookie) {
        self.inner.lock().add(cookie);
    }

    /// Remove the stored cookie with the same identity, if any.
    pub fn remove_cookie(&self, cookie: &Cookie) {
        self.inner
            .lock()
            .cookies
            .retain(|c| !c.matches_cookie(cookie));
    }

    /// Number of cookies currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().cookies.len()
    }

    /// `true` when the jar holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().cookies.is_empty()
    }

    /// Store the cookies of a response.
    ///
    /// `cookies` is the `Set-Cookie` table collected by the response
    /// parser; `request_url` is the URL the request was made to.
    pub fn add_from_response(&self, request_url: &Url, cookies: &HeaderTable) {
        self.add_from_response_at(request_url, Timestamp::now(), cookies);
    }

    /// [`Self::add_from_response`] with an explicit current time.
    pub fn add_from_response_at(&self, request_url: &Url, now: Timestamp, cookies: &HeaderTable) {
        let mut inner = self.inner.lock();
        for field in cookies {
            let cookie = Cookie::from_response(request_url, now, field);
            if cookie.is_valid() {
                inner.add(cookie);
            } else {
                tracing::debug!(name = field.name(), "dropping invalid cookie");
            }
        }
    }

    /// Feed all cookies matching a request to `consumer`, skipping
    /// expired ones, in insertion order.
    pub fn enumerate_for(&self, request_url: &Url, consumer: &mut dyn HeaderConsumer) {
        self.enumerate_for_at(request_url, Timestamp::now(), consumer);
    }

    /// [`Self::enumerate_for`] with an explicit current time.
    pub fn enumerate_for_at(
        &self,
        request_url: &Url,
        now: Timestamp,
        consumer: &mut dyn HeaderConsumer,
    ) {
        let inner = self.inner.lock();
        for cookie in &inner.cookies {
            if !cookie.is_expired(now) && cookie.matches_url(request_url) {
                consumer.handle_header(cookie.name(), cookie.value());
            }
        }
    }

    /// Load cookies from a `cookies.txt` stream.
    ///
    /// Lines that do not parse (comments included) are skipped, not
    /// fatal; I/O errors are.
    pub fn load(&self, reader: impl BufRead) -> io::Result<()> {
        for line in reader.lines() {
            let line = line?;
            match Cookie::parse_line(&line) {
                Some(cookie) => self.add_cookie(cookie),
                None => {
                    if !line.is_empty() && !line.starts_with('#') {
                        tracing::warn!(%line, "skipping unparseable cookie line");
                    }
                }
            }
        }
        Ok(())
    }

    /// Save all persistent cookies as `cookies.txt` lines.
    pub fn save(&self, mut writer: impl Write) -> io::Result<()> {
        let inner = self.inner.lock();
        for cookie in &inner.cookies {
            if cookie.is_persistent() {
                writeln!(writer, "{}", cookie.to_line())?;
            }
        }
        Ok(())
    }
}
