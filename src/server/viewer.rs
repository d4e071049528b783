//! Viewer module - generates an HTML page showing the served layer with MapLibre GL.

/// Initial map centre, `[lon, lat]` (Pune).
const DEFAULT_CENTER: [f64; 2] = [73.8567, 18.5204];

/// Initial map zoom.
const DEFAULT_ZOOM: u8 = 11;

/// Escape HTML special characters to prevent XSS attacks.
fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Quote a value as a JavaScript string literal that is safe inside `<script>`.
fn js_string(s: &str) -> String {
    serde_json::Value::from(s)
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

/// Generate an HTML page with a MapLibre GL map drawing the lines of `layer`.
///
/// # Arguments
///
/// * `layer` - The layer name (URL-encoded in the tile URL template)
/// * `base_url` - Base URL for tile requests (e.g., "http://localhost:8080")
pub fn generate_viewer_html(layer: &str, base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let encoded_layer = urlencoding::encode(layer);
    let tile_url = format!("{base_url}/tiles/{encoded_layer}/{{z}}/{{x}}/{{y}}.mvt");

    let layer_json = js_string(layer);
    let tile_url_json = js_string(&tile_url);

    let escaped_layer = html_escape(layer);
    let [center_lon, center_lat] = DEFAULT_CENTER;

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Vector Tiles - {escaped_layer}</title>
    <script src="https://unpkg.com/maplibre-gl@4.7.1/dist/maplibre-gl.js"></script>
    <link href="https://unpkg.com/maplibre-gl@4.7.1/dist/maplibre-gl.css" rel="stylesheet">
    <style>
        * {{
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }}
        body {{
            background: #0f0f0f;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif;
            overflow: hidden;
        }}
        #map {{
            width: 100vw;
            height: 100vh;
        }}
        .info-panel {{
            position: absolute;
            top: 16px;
            left: 16px;
            background: rgba(20, 20, 20, 0.85);
            color: #e5e5e5;
            padding: 12px 16px;
            border-radius: 8px;
            font-size: 13px;
            z-index: 1;
        }}
        .info-panel h1 {{
            font-size: 15px;
            font-weight: 600;
            margin-bottom: 4px;
        }}
        .info-panel .meta {{
            color: #a3a3a3;
        }}
    </style>
</head>
<body>
    <div id="map"></div>
    <div class="info-panel">
        <h1>{escaped_layer}</h1>
        <div class="meta">zoom <span id="zoom">{DEFAULT_ZOOM}</span></div>
    </div>
    <script>
        const layer = {layer_json};
        const map = new maplibregl.Map({{
            container: 'map',
            center: [{center_lon}, {center_lat}],
            zoom: {DEFAULT_ZOOM},
            style: {{
                version: 8,
                sources: {{
                    tiles: {{
                        type: 'vector',
                        tiles: [{tile_url_json}],
                        maxzoom: 30
                    }}
                }},
                layers: [
                    {{
                        id: 'background',
                        type: 'background',
                        paint: {{ 'background-color': '#0f0f0f' }}
                    }},
                    {{
                        id: 'lines',
                        type: 'line',
                        source: 'tiles',
                        'source-layer': layer,
                        paint: {{
                            'line-color': '#f59e0b',
                            'line-width': 1.5
                        }}
                    }}
                ]
            }}
        }});

        map.addControl(new maplibregl.NavigationControl());
        map.on('zoom', () => {{
            document.getElementById('zoom').textContent = map.getZoom().toFixed(1);
        }});
        map.on('click', 'lines', (e) => {{
            const props = e.features[0].properties;
            new maplibregl.Popup()
                .setLngLat(e.lngLat)
                .setText([props.name, props.highway].filter(Boolean).join(' · '))
                .addTo(map);
        }});
    </script>
</body>
</html>
"##
    )
}
