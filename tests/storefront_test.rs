use std::fs;
use std::path::Path;

use storefront_kit::catalog::write_catalog;
use storefront_kit::model::{Brand, CatalogRow, ClientConfig, ImageRef, StripeMode, VariantRef};
use storefront_kit::storefront::{
    build_single, build_site, filter_products, list_stores, render_store, SiteLayout,
};
use tempfile::tempdir;

fn row(sku: &str, active: bool, link: Option<&str>) -> CatalogRow {
    CatalogRow {
        id: format!("page-{sku}"),
        name: format!("Item {sku}"),
        sku: sku.to_string(),
        price: 12.5,
        currency: "usd".into(),
        link: link.map(str::to_string),
        mode: StripeMode::Test,
        active,
        images: vec![],
        variants: vec![],
    }
}

fn skus(rows: &[&CatalogRow]) -> Vec<String> {
    rows.iter().map(|r| r.sku.clone()).collect()
}

#[test]
fn allowlist_wins_over_prefixes() {
    let products = vec![row("A", true, None), row("B1", true, None), row("C", true, None)];
    let client = ClientConfig {
        sku_allowlist: vec![" A ".into()],
        sku_prefixes: vec!["B".into()],
        ..ClientConfig::default()
    };
    assert_eq!(skus(&filter_products(&products, &client)), vec!["A"]);
}

#[test]
fn prefixes_apply_without_allowlist() {
    let products = vec![row("CYS-1", true, None), row("CYS-2", false, None), row("ZZ-1", true, None)];
    let client = ClientConfig {
        sku_prefixes: vec!["CYS-".into()],
        ..ClientConfig::default()
    };
    assert_eq!(skus(&filter_products(&products, &client)), vec!["CYS-1"]);
}

#[test]
fn no_filters_keep_every_active_row() {
    let products = vec![row("A", true, None), row("B", false, None), row("C", true, None)];
    assert_eq!(
        skus(&filter_products(&products, &ClientConfig::default())),
        vec!["A", "C"]
    );
}

#[test]
fn store_page_renders_cards_and_theme() {
    let mut tent = row("CYS-TENT-1", true, Some("https://buy.stripe.com/test_1"));
    tent.name = "Tent <2p>".into();
    tent.price = 750.0;
    tent.images = vec![ImageRef {
        url: "assets/products/CYS-TENT-1/01.jpg".into(),
        alt: None,
    }];
    tent.variants = vec![VariantRef {
        label: Some("Variant 1".into()),
        url: "https://cdn.example.com/v1.png".into(),
    }];
    let unlinked = row("CYS-LAMP-2", true, None);

    let client = ClientConfig {
        name: "Camp Co".into(),
        brand: Brand {
            accent: Some("#22c55e".into()),
            logo: Some("/logo.png".into()),
            ..Brand::default()
        },
        ..ClientConfig::default()
    };

    let html = render_store(&client, "camp", &[tent, unlinked], "/kit");

    assert!(html.contains("<title>Camp Co | Storefront</title>"));
    assert!(html.contains("--primary: #22c55e"));
    assert!(html.contains("--bg1: #0b1316"));
    assert!(html.contains("src=\"/kit/logo.png\""));
    assert!(html.contains("Tent &lt;2p&gt;"));
    assert!(html.contains("$750.00"));
    assert!(html.contains("href=\"https://buy.stripe.com/test_1\""));
    assert!(html.contains("<button class=\"buy\" disabled>Unavailable</button>"));
    assert!(html.contains("src=\"/kit/assets/products/CYS-TENT-1/01.jpg\""));
    assert!(html.contains("https://cdn.example.com/v1.png"));
    assert!(html.contains("No image"));
}

fn write_client(stores: &Path, slug: &str, body: &str) {
    let dir = stores.join(slug);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("client.json"), body).unwrap();
}

#[tokio::test]
async fn list_stores_requires_client_json() {
    let td = tempdir().unwrap();
    let stores = td.path().join("stores");
    write_client(&stores, "beta", "{}");
    write_client(&stores, "alpha", "{}");
    fs::create_dir_all(stores.join("empty")).unwrap();
    fs::write(stores.join("stray.txt"), "x").unwrap();

    assert_eq!(list_stores(&stores).await.unwrap(), vec!["alpha", "beta"]);
    assert!(list_stores(&td.path().join("missing")).await.unwrap().is_empty());
}

#[tokio::test]
async fn build_site_writes_pages_and_error_fallback() {
    let td = tempdir().unwrap();
    let root = td.path();
    let products = root.join("data").join("products.json");
    write_catalog(
        &products,
        &[
            row("CYS-1", true, Some("https://buy.stripe.com/a")),
            row("OTHER-1", true, Some("https://buy.stripe.com/b")),
        ],
    )
    .await
    .unwrap();

    let stores = root.join("stores");
    write_client(&stores, "camp", r#"{ "name": "Camp", "sku_prefixes": ["CYS-"] }"#);
    write_client(&stores, "broken", "{ nope");

    let layout = SiteLayout {
        products,
        stores_dir: stores,
        out_dir: root.join("site"),
        base_path: String::new(),
    };
    let pages = build_site(&layout).await.unwrap();
    assert_eq!(pages.len(), 2);

    let camp = fs::read_to_string(root.join("site/camp/index.html")).unwrap();
    assert!(camp.contains("CYS-1"));
    assert!(!camp.contains("OTHER-1"));

    let broken = fs::read_to_string(root.join("site/broken/index.html")).unwrap();
    assert!(broken.contains("Failed to load catalog. Please refresh."));

    assert!(root.join("site/static/style.css").exists());
    let index = fs::read_to_string(root.join("site/index.html")).unwrap();
    assert!(index.contains("href=\"camp/\""));
    assert!(index.contains("Broken"));
}

#[tokio::test]
async fn single_client_file_renders_one_store() {
    let td = tempdir().unwrap();
    let root = td.path();
    let products = root.join("data").join("products.json");
    write_catalog(
        &products,
        &[
            row("CYS-1", true, Some("https://buy.stripe.com/a")),
            row("OTHER-1", true, None),
        ],
    )
    .await
    .unwrap();
    let client = root.join("data").join("client.json");
    fs::write(
        &client,
        r#"{ "name": "Camp", "slug": "camp", "sku_allowlist": ["CYS-1"] }"#,
    )
    .unwrap();

    let layout = SiteLayout {
        products,
        stores_dir: root.join("unused"),
        out_dir: root.join("site"),
        base_path: String::new(),
    };
    let page = build_single(&layout, &client).await.unwrap();

    assert_eq!(page, root.join("site/camp/index.html"));
    let html = fs::read_to_string(&page).unwrap();
    assert!(html.contains("CYS-1"));
    assert!(!html.contains("OTHER-1"));
    assert!(root.join("site/static/style.css").exists());
}

#[tokio::test]
async fn single_client_without_slug_uses_default_dir() {
    let td = tempdir().unwrap();
    let root = td.path();
    let client = root.join("client.json");
    fs::write(&client, r#"{ "name": "Camp" }"#).unwrap();

    let layout = SiteLayout {
        products: root.join("missing-products.json"),
        stores_dir: root.join("unused"),
        out_dir: root.join("site"),
        base_path: String::new(),
    };
    let page = build_single(&layout, &client).await.unwrap();

    assert_eq!(page, root.join("site/store/index.html"));
    let html = fs::read_to_string(&page).unwrap();
    assert!(html.contains("Failed to load catalog. Please refresh."));
}

#[tokio::test]
async fn missing_catalog_gives_every_store_the_error_page() {
    let td = tempdir().unwrap();
    let root = td.path();
    let stores = root.join("stores");
    write_client(&stores, "alpha", "{}");
    write_client(&stores, "beta", "{}");

    let layout = SiteLayout {
        products: root.join("nope.json"),
        stores_dir: stores,
        out_dir: root.join("site"),
        base_path: String::new(),
    };
    let pages = build_site(&layout).await.unwrap();

    assert_eq!(pages.len(), 2);
    for page in pages {
        let html = fs::read_to_string(page).unwrap();
        assert!(html.contains("Failed to load catalog. Please refresh."));
    }
}
