//! HTML for a store page, the store index and the load-failure page.
use chrono::Datelike;

use crate::model::{CatalogRow, ClientConfig};
use crate::storefront::deck::ImageDeck;

const DEFAULT_PRIMARY: &str = "#0f172a";
const DEFAULT_TEXT: &str = "#e7f3ea";
const DEFAULT_BG1: &str = "#0b1316";
const DEFAULT_BG2: &str = "#0f1a1f";

/// Resolve an asset path against the site's base path. Absolute URLs and
/// paths already under the base are returned unchanged.
pub fn with_base(base_path: &str, path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    if path.is_empty() {
        return String::new();
    }
    let lower = path.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return path.to_string();
    }
    if !base.is_empty() && path.starts_with(&format!("{}/", base)) {
        return path.to_string();
    }
    if path.starts_with('/') {
        return format!("{}{}", base, path);
    }
    format!("{}/{}", base, path.trim_start_matches("./"))
}

/// `$12.50`
pub fn format_price(price: f64) -> String {
    format!("${:.2}", price)
}

pub fn render_store(client: &ClientConfig, slug: &str, products: &[CatalogRow], base_path: &str) -> String {
    let title = display_name(client, slug);
    let brand = &client.brand;
    let primary = brand
        .primary
        .as_deref()
        .or(brand.accent.as_deref())
        .unwrap_or(DEFAULT_PRIMARY);
    let text = brand.text.as_deref().unwrap_or(DEFAULT_TEXT);
    let bg1 = brand.bg1.as_deref().unwrap_or(DEFAULT_BG1);
    let bg2 = brand.bg2.as_deref().unwrap_or(DEFAULT_BG2);

    let logo = brand
        .logo
        .as_deref()
        .map(|l| with_base(base_path, l))
        .filter(|l| !l.is_empty())
        .map(|l| {
            format!(
                "<img src=\"{}\" alt=\"{} logo\" />",
                html_attr(&l),
                html_attr(&title)
            )
        })
        .unwrap_or_default();
    let hero = brand
        .hero
        .as_deref()
        .map(|h| with_base(base_path, h))
        .filter(|h| !h.is_empty())
        .map(|h| format!(" style=\"background-image: url('{}')\"", html_attr(&h)))
        .unwrap_or_default();

    let cards = if products.is_empty() {
        "<p class=\"empty\">No products available.</p>".to_string()
    } else {
        products
            .iter()
            .map(|p| render_card(p, base_path))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} | Storefront</title>
    <link rel="stylesheet" href="../static/style.css">
    <style>:root {{ --primary: {primary}; --text: {text}; --bg1: {bg1}; --bg2: {bg2}; }}</style>
  </head>
  <body>
    <div class="wrap">
      <div class="hero"{hero}>
        <div class="brand">
          {logo}
          <div>
            <h1>{title}</h1>
            <div class="tagline">Curated catalog. Secure Stripe checkout.</div>
          </div>
        </div>
      </div>
      <div class="grid">
{cards}
      </div>
      <div class="footer">&copy; {year} {title}</div>
    </div>
    <div class="deck" id="deck" hidden>
      <button class="deck-close" data-deck-close aria-label="Close">&times;</button>
      <button class="deck-prev" data-deck-prev aria-label="Previous">&lsaquo;</button>
      <img class="deck-image" id="deck-image" alt="">
      <button class="deck-next" data-deck-next aria-label="Next">&rsaquo;</button>
      <div class="deck-thumbs" id="deck-thumbs"></div>
    </div>
    <script>{script}</script>
  </body>
</html>
"#,
        title = html_escape(&title),
        primary = css_value(primary),
        text = css_value(text),
        bg1 = css_value(bg1),
        bg2 = css_value(bg2),
        hero = hero,
        logo = logo,
        cards = cards,
        year = chrono::Local::now().year(),
        script = DECK_SCRIPT,
    )
}

fn render_card(product: &CatalogRow, base_path: &str) -> String {
    let deck = ImageDeck::from_row(product).map_urls(|u| with_base(base_path, u));
    let first = deck.urls().first().cloned();
    let plan = deck.plan(first.as_deref());
    let thumb = match first.as_deref() {
        Some(first) => format!(
            "<img src=\"{}\" alt=\"{}\" />",
            html_attr(first),
            html_attr(&product.name)
        ),
        None => "<span>No image</span>".to_string(),
    };
    // Plain strings and integers always serialize.
    let deck_json = serde_json::to_string(&plan).unwrap_or_else(|_| "{}".into());
    let buy = match product.link.as_deref().filter(|l| !l.is_empty()) {
        Some(link) => format!(
            "<a class=\"buy\" href=\"{}\" target=\"_blank\" rel=\"noreferrer\">Buy</a>",
            html_attr(link)
        ),
        None => "<button class=\"buy\" disabled>Unavailable</button>".to_string(),
    };

    format!(
        r#"        <div class="card" data-sku="{sku_attr}">
          <div class="thumb" data-deck="{deck}">{thumb}</div>
          <div class="card-body">
            <div class="card-title">{name}</div>
            <div class="sku">{sku}</div>
            <div class="price">{price}</div>
            {buy}
          </div>
        </div>"#,
        sku_attr = html_attr(&product.sku),
        deck = html_attr(&deck_json),
        thumb = thumb,
        name = html_escape(&product.name),
        sku = html_escape(&product.sku),
        price = format_price(product.price),
        buy = buy,
    )
}

/// Shown instead of a store page when its data cannot be loaded.
pub fn render_error(title: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <link rel="stylesheet" href="../static/style.css">
  </head>
  <body>
    <div class="wrap">
      <div class="error">Failed to load catalog. Please refresh.</div>
    </div>
  </body>
</html>
"#,
        title = html_escape(title)
    )
}

/// Landing page linking every store. `stores` is `(slug, display name)`.
pub fn render_index(stores: &[(String, String)]) -> String {
    let items = stores
        .iter()
        .map(|(slug, name)| {
            format!(
                "        <li><a href=\"{}/\">{}</a></li>",
                html_attr(slug),
                html_escape(name)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Storefronts</title>
    <link rel="stylesheet" href="static/style.css">
  </head>
  <body>
    <div class="wrap">
      <h1>Storefronts</h1>
      <ul class="stores">
{items}
      </ul>
      <div class="footer">&copy; {year} Powered by Notion &amp; Stripe</div>
    </div>
  </body>
</html>
"#,
        items = items,
        year = chrono::Local::now().year(),
    )
}

/// Client name, else the slug made readable (`camp-gear` → `Camp Gear`).
pub fn display_name(client: &ClientConfig, slug: &str) -> String {
    let name = client.name.trim();
    if !name.is_empty() {
        return name.to_string();
    }
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn html_attr(s: &str) -> String {
    html_escape(s).replace('"', "&quot;").replace('\'', "&#39;")
}

// Brand colors end up inside a <style> block.
fn css_value(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>'))
        .collect()
}

const DECK_SCRIPT: &str = r#"
(function () {
  var deck = document.getElementById('deck');
  var img = document.getElementById('deck-image');
  var thumbs = document.getElementById('deck-thumbs');
  var plan = null, index = 0;
  function show() {
    img.src = plan.urls[index] || '';
    Array.prototype.forEach.call(thumbs.children, function (t, i) {
      t.classList.toggle('active', i === index);
    });
  }
  function open(p) {
    plan = p;
    index = p.start;
    thumbs.innerHTML = '';
    p.urls.forEach(function (u, i) {
      var t = document.createElement('img');
      t.src = u;
      t.onclick = function () { index = i; show(); };
      thumbs.appendChild(t);
    });
    deck.hidden = false;
    show();
  }
  document.querySelectorAll('[data-deck]').forEach(function (el) {
    el.addEventListener('click', function () {
      var p = JSON.parse(el.getAttribute('data-deck') || '{}');
      if (p.urls && p.urls.length) open(p);
    });
  });
  deck.querySelector('[data-deck-next]').onclick = function () {
    if (plan && plan.urls.length) { index = plan.next[index]; show(); }
  };
  deck.querySelector('[data-deck-prev]').onclick = function () {
    if (plan && plan.urls.length) { index = plan.prev[index]; show(); }
  };
  deck.querySelector('[data-deck-close]').onclick = function () { deck.hidden = true; };
})();
"#;

pub const DEFAULT_STYLE: &str = r#"
html,
body {
  margin: 0;
  background: linear-gradient(180deg, var(--bg1, #0b1316), var(--bg2, #0f1a1f));
  color: var(--text, #e7f3ea);
  font-family: system-ui, -apple-system, 'Segoe UI', Roboto, Inter, Arial, sans-serif;
  min-height: 100vh;
}

.wrap {
  max-width: 1100px;
  margin: 0 auto;
  padding: 16px;
}

.hero {
  min-height: 180px;
  background-size: cover;
  background-position: center;
  border-radius: 14px;
  border: 1px solid rgba(255, 255, 255, .08);
  display: flex;
  align-items: center;
  padding: 16px;
  box-sizing: border-box;
  margin: 14px 0 18px;
}

.brand {
  display: flex;
  gap: 14px;
  align-items: center;
  background: rgba(0, 0, 0, .35);
  padding: 10px 14px;
  border-radius: 12px;
}

.brand img { height: 52px; width: auto; border-radius: 10px; }
h1 { margin: 0; font-size: 22px; }
.tagline { opacity: .8; font-size: 13px; }

.grid {
  display: grid;
  grid-template-columns: repeat(auto-fill, minmax(240px, 1fr));
  gap: 16px;
}

.card {
  background: rgba(255, 255, 255, .06);
  border: 1px solid rgba(255, 255, 255, .12);
  border-radius: 14px;
  overflow: hidden;
}

.thumb {
  height: 180px;
  background: rgba(0, 0, 0, .25);
  display: flex;
  align-items: center;
  justify-content: center;
  cursor: zoom-in;
}

.thumb img { max-height: 170px; max-width: 95%; object-fit: contain; }
.card-body { padding: 14px 16px 16px; }
.card-title { font-weight: 700; margin-bottom: 6px; }
.sku { opacity: .7; font-size: 12px; margin-bottom: 6px; }
.price { color: var(--primary, #0f172a); font-weight: 800; margin-bottom: 10px; }

.buy {
  box-sizing: border-box;
  width: 100%;
  background: #1a2640;
  color: #d5e8ff;
  border: 1px solid rgba(255, 255, 255, .12);
  border-radius: 10px;
  padding: 12px;
  font-weight: 700;
  text-align: center;
  text-decoration: none;
  display: inline-block;
  cursor: pointer;
}

.buy:disabled { opacity: .5; cursor: not-allowed; }

.deck {
  position: fixed;
  inset: 0;
  background: rgba(0, 0, 0, .85);
  display: flex;
  flex-direction: column;
  align-items: center;
  justify-content: center;
}

.deck[hidden] { display: none; }
.deck-image { max-width: 90vw; max-height: 75vh; object-fit: contain; }
.deck-close { position: absolute; top: 12px; right: 16px; }
.deck-prev { position: absolute; left: 16px; top: 50%; }
.deck-next { position: absolute; right: 16px; top: 50%; }
.deck button { background: none; border: 0; color: #fff; font-size: 36px; cursor: pointer; }
.deck-thumbs { display: flex; gap: 8px; margin-top: 12px; }
.deck-thumbs img { height: 56px; opacity: .6; cursor: pointer; }
.deck-thumbs img.active { opacity: 1; outline: 2px solid #fff; }

.error { padding: 40px 0; text-align: center; }
.footer { text-align: center; font-size: 12px; opacity: .7; margin: 28px 0 60px; }
"#;
