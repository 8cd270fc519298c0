use crate::feed::types::{MarketId, SourceEvent, SourceMarket};
use crate::feed::MarketSource;
use crate::model::{NormalizedEvent, NormalizedMarket, NormalizedOption, Odds};
use anyhow::{Context, Result};

/// Decode fractional odds text. "3/5" -> num 3, den 5.
/// Both halves must be integers and there must be exactly one `/`.
pub fn parse_odds(s: &str) -> Option<Odds> {
    let (num, den) = s.split_once('/')?;
    let num = num.parse::<i64>().ok()?;
    let den = den.parse::<i64>().ok()?;
    Some(Odds { num, den })
}

/// Normalize one fetched market. Any bad odds string fails the whole market.
pub fn convert_market(market_id: MarketId, market: SourceMarket) -> Result<NormalizedMarket> {
    let options = market
        .options
        .into_iter()
        .map(|o| {
            let odds = parse_odds(&o.odds).with_context(|| {
                format!(
                    "failed to parse odds {:?} for option {} in market {}",
                    o.odds, o.id, market_id
                )
            })?;
            Ok(NormalizedOption {
                id: o.id,
                name: o.name,
                odds,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NormalizedMarket {
        id: market.id,
        market_type: market.market_type,
        options,
    })
}

/// Fetch every market the event references and build the normalized event.
///
/// Markets keep the order the event lists them in. The first market that
/// cannot be fetched or decoded fails the entire event.
pub async fn convert_event(
    event: SourceEvent,
    markets: &dyn MarketSource,
) -> Result<NormalizedEvent> {
    let mut converted = Vec::with_capacity(event.markets.len());
    for &market_id in &event.markets {
        let market = markets
            .market_by_id(market_id)
            .await
            .with_context(|| format!("market {} unavailable", market_id))?;
        converted.push(convert_market(market_id, market)?);
    }

    Ok(NormalizedEvent {
        id: event.id.to_string(),
        name: event.name,
        time: event.time,
        markets: converted,
    })
}
