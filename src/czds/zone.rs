use reqwest::header::HeaderMap;
use reqwest::Response;

use super::error::FetchError;
use super::list::ZoneTarget;
use super::metadata::{self, ZoneMetadata, ZONE_CONTENT_TYPE};
use crate::auth::Session;

/// Issue the streaming GET for a zone and validate the response.
///
/// On success the body has not been read yet; the caller streams it.
pub async fn request_zone(
    session: &Session,
    target: &ZoneTarget,
) -> Result<(ZoneMetadata, Response), FetchError> {
    let response = session
        .get_stream(target.url())
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            zone: target.zone(),
            source,
        })?;
    let meta = validate(target, response.status().as_u16(), response.headers())?;
    Ok((meta, response))
}

/// HEAD the zone: the same checks as [`request_zone`], without a body.
pub async fn head_zone(session: &Session, target: &ZoneTarget) -> Result<ZoneMetadata, FetchError> {
    let response = session
        .head(target.url())
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            zone: target.zone(),
            source,
        })?;
    validate(target, response.status().as_u16(), response.headers())
}

fn validate(target: &ZoneTarget, status: u16, headers: &HeaderMap) -> Result<ZoneMetadata, FetchError> {
    match status {
        200 => {}
        403 => return Err(FetchError::Forbidden { zone: target.zone() }),
        status => {
            return Err(FetchError::HttpStatus {
                zone: target.zone(),
                status,
            })
        }
    }

    let actual = metadata::media_type(headers);
    if actual != ZONE_CONTENT_TYPE {
        return Err(FetchError::ContentTypeMismatch {
            zone: target.zone(),
            expected: ZONE_CONTENT_TYPE,
            actual,
        });
    }

    metadata::parse_headers(headers).map_err(|source| FetchError::Header {
        zone: target.zone(),
        source,
    })
}
