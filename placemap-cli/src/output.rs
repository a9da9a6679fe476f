//! GeoJSON rendering of a map payload.

use placemap_core::MapPayload;
use serde_json::{json, Value};

/// One Point feature per resolved row, in payload order.
///
/// GeoJSON positions are `[lon, lat]`. Popup rows and the raw row travel in
/// the feature properties.
pub fn feature_collection(payload: &MapPayload) -> Value {
    let features: Vec<Value> = payload
        .points
        .iter()
        .map(|point| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [point.lon, point.lat],
                },
                "properties": {
                    "popup": point.popup,
                    "row": point.row,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
        "properties": {
            "sheetId": payload.sheet_id,
            "labels": payload.labels,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use placemap_core::{MapConfig, MapSession, RowBatch, Row};

    #[test]
    fn test_feature_collection() {
        let mut session = MapSession::new(
            MapConfig::from_query("id=abc&coordsLabels=lat,lon&labels=name"),
            None,
        );
        session.apply(&RowBatch::loaded(vec![
            Row::from([("lat", "51.1"), ("lon", "17.0"), ("name", "A")]),
            Row::from([("lat", "0"), ("lon", "17.0"), ("name", "B")]),
        ]));

        let collection = feature_collection(&session.payload());

        assert_eq!(collection["type"], "FeatureCollection");
        assert_eq!(collection["properties"]["sheetId"], "abc");
        let features = collection["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["geometry"]["coordinates"], json!([17.0, 51.1]));
        assert_eq!(features[0]["properties"]["popup"][0]["value"], "A");
    }
}
