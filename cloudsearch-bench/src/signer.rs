use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Request;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use sha2::{Digest, Sha256};

use crate::StdResult;

type HmacSha256 = Hmac<Sha256>;

const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";
const AMZ_DATE_HEADER: &str = "x-amz-date";
const CLOUDSEARCH_SERVICE: &str = "cloudsearch";

/// Characters left as is by the canonical uri encoding: `A-Z a-z 0-9 - _ . ~`
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Sign requests with the AWS Signature Version 4 scheme.
#[derive(Clone)]
pub struct RequestSigner {
    access_key_id: String,
    secret_key: String,
    region: String,
    service: String,
}

impl RequestSigner {
    /// Signer for the CloudSearch service of the given region
    pub fn cloudsearch<A: Into<String>, S: Into<String>, R: Into<String>>(
        access_key_id: A,
        secret_key: S,
        region: R,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            service: CLOUDSEARCH_SERVICE.to_string(),
        }
    }

    /// Add the date and authorization headers to the request, signed at the current time.
    pub fn sign(&self, request: &mut Request) -> StdResult<()> {
        self.sign_at(request, Utc::now())
    }

    pub(crate) fn sign_at(&self, request: &mut Request, time: DateTime<Utc>) -> StdResult<()> {
        let amz_date = time.format("%Y%m%dT%H%M%SZ").to_string();
        let date = time.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);

        let (canonical_request, signed_headers) = canonical_request(request, &amz_date)?;
        let string_to_sign = format!(
            "{SIGNING_ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );
        let signing_key = self.signing_key(&date)?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{SIGNING_ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key_id
        );
        let headers = request.headers_mut();
        headers.insert(AMZ_DATE_HEADER, HeaderValue::from_str(&amz_date)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization).with_context(|| "Invalid authorization header")?,
        );

        Ok(())
    }

    fn signing_key(&self, date: &str) -> StdResult<Vec<u8>> {
        let date_key = hmac_sha256(format!("AWS4{}", self.secret_key).as_bytes(), date.as_bytes())?;
        let region_key = hmac_sha256(&date_key, self.region.as_bytes())?;
        let service_key = hmac_sha256(&region_key, self.service.as_bytes())?;

        hmac_sha256(&service_key, b"aws4_request")
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> StdResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| anyhow!(e))?;
    mac.update(data);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Build the canonical request, returns it along with the list of signed headers.
fn canonical_request(request: &Request, amz_date: &str) -> StdResult<(String, String)> {
    let url = request.url();
    let host = url
        .host_str()
        .with_context(|| format!("Can not sign a request without host: '{url}'"))?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut headers = vec![
        ("host".to_string(), host),
        (AMZ_DATE_HEADER.to_string(), amz_date.to_string()),
    ];
    if let Some(content_type) = request.headers().get(CONTENT_TYPE) {
        headers.push((
            CONTENT_TYPE.as_str().to_string(),
            content_type.to_str()?.trim().to_string(),
        ));
    }
    headers.sort();

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let payload = request
        .body()
        .and_then(|body| body.as_bytes())
        .unwrap_or_default();
    let canonical_uri = match url.path() {
        "" => "/",
        path => path,
    };

    let canonical_request = format!(
        "{}\n{canonical_uri}\n{}\n{canonical_headers}\n{signed_headers}\n{}",
        request.method().as_str(),
        canonical_query_string(request),
        hex::encode(Sha256::digest(payload))
    );

    Ok((canonical_request, signed_headers))
}

fn canonical_query_string(request: &Request) -> String {
    let mut pairs: Vec<(String, String)> = request
        .url()
        .query_pairs()
        .map(|(k, v)| {
            (
                utf8_percent_encode(&k, URI_ENCODE_SET).to_string(),
                utf8_percent_encode(&v, URI_ENCODE_SET).to_string(),
            )
        })
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use reqwest::{Method, Url};

    use super::*;

    fn signer() -> RequestSigner {
        RequestSigner {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            region: "us-east-1".to_string(),
            service: "iam".to_string(),
        }
    }

    fn signing_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    fn get_request(url: &str) -> Request {
        Request::new(Method::GET, Url::parse(url).unwrap())
    }

    #[test]
    fn derive_signing_key() {
        let signing_key = signer().signing_key("20150830").unwrap();

        assert_eq!(
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9",
            hex::encode(signing_key)
        );
    }

    #[test]
    fn canonical_query_string_is_sorted_and_encoded() {
        let request = get_request("http://search.example.com/2013-01-01/search?size=10&q=Ada Lovelace&a=%2F");

        assert_eq!(
            "a=%2F&q=Ada%20Lovelace&size=10",
            canonical_query_string(&request)
        );
    }

    #[test]
    fn canonical_request_lists_signed_headers() {
        let mut request = get_request("http://search.example.com:8080/2013-01-01/search?q=user1");
        request.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=UTF-8"),
        );

        let (canonical_request, signed_headers) =
            canonical_request(&request, "20150830T123600Z").unwrap();

        assert_eq!("content-type;host;x-amz-date", signed_headers);
        assert_eq!(
            format!(
                "GET\n/2013-01-01/search\nq=user1\n\
                content-type:application/json; charset=UTF-8\n\
                host:search.example.com:8080\n\
                x-amz-date:20150830T123600Z\n\n\
                content-type;host;x-amz-date\n{}",
                hex::encode(Sha256::digest(b""))
            ),
            canonical_request
        );
    }

    #[test]
    fn sign_adds_date_and_authorization_headers() {
        let mut request = get_request("https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08");

        signer().sign_at(&mut request, signing_time()).unwrap();

        assert_eq!(
            request.headers().get(AMZ_DATE_HEADER).unwrap(),
            "20150830T123600Z"
        );
        let authorization = request.headers().get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(
            authorization.starts_with(
                "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, \
                SignedHeaders=host;x-amz-date, Signature="
            ),
            "unexpected authorization header: {authorization}"
        );
    }

    #[test]
    fn signature_depends_on_payload() {
        let sign_with_body = |body: &'static str| {
            let mut request = Request::new(
                Method::POST,
                Url::parse("http://doc.example.com/2013-01-01/documents/batch").unwrap(),
            );
            *request.body_mut() = Some(body.into());
            signer().sign_at(&mut request, signing_time()).unwrap();
            request.headers().get(AUTHORIZATION).unwrap().clone()
        };

        assert_eq!(sign_with_body("[]"), sign_with_body("[]"));
        assert_ne!(sign_with_body("[]"), sign_with_body("[{}]"));
    }

    #[test]
    fn debug_output_hides_secret_key() {
        let debug = format!("{:?}", signer());

        assert!(!debug.contains("wJalrXUtnFEMI"));
        assert!(debug.contains("AKIDEXAMPLE"));
    }
}
