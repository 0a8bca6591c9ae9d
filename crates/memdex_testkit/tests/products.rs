//! Query pipeline tests over the product catalogue.

use memdex_codec::{doc, Document};
use memdex_core::{AccessPath, Direction, Operator, SortKey, StoreError};
use memdex_testkit::prelude::*;

fn price(p: &Document) -> i64 {
    p.get("price").as_integer().unwrap_or_default()
}

fn category(p: &Document) -> &str {
    p.get("category").as_text().unwrap_or_default()
}

fn by_id<I: IntoIterator<Item = Document>>(docs: I) -> Vec<Document> {
    let mut docs: Vec<Document> = docs.into_iter().collect();
    docs.sort_by_key(|d| d.get("id").as_integer());
    docs
}

#[test]
fn load_and_read_back() {
    init_tracing();
    let store = product_store();
    assert_eq!(store.len(), PRODUCTS.len());
    assert_eq!(store.data(), products());
    assert_eq!(store.get(1), products().into_iter().next());
    assert_eq!(store.select_all().data().unwrap(), products());
}

#[test]
fn select_one_by_key() {
    let store = product_store();
    let apple = store.select_all().eq("id", 1).unwrap().single().unwrap();
    assert_eq!(apple, store.get(1));
    assert_eq!(store.select_all().eq("id", 1).unwrap().explain(), AccessPath::PrimaryKey);
}

#[test]
fn fruit_page_then_sort_with_projection() {
    let store = product_store();
    let rows = store
        .select(["id", "name", "price"])
        .eq("category", "Fruit")
        .unwrap()
        .gte("price", 10)
        .unwrap()
        .range(3, Some(3))
        .order_by([SortKey::from("name"), SortKey::desc("price")])
        .data()
        .unwrap();

    let mut expected = products_where(|p| category(p) == "Fruit" && price(p) >= 10)[3..6].to_vec();
    expected.sort_by(|a, b| {
        a.get("name")
            .as_text()
            .cmp(&b.get("name").as_text())
            .then_with(|| price(b).cmp(&price(a)))
    });
    let expected: Vec<Document> = expected
        .iter()
        .map(|p| p.pick(&["id", "name", "price"]))
        .collect();

    assert_eq!(rows, expected);
}

#[test]
fn sort_then_page_differs_from_page_then_sort() {
    let store = product_store();
    let sorted_first = store
        .select_all()
        .order_by([("price", Direction::Desc)])
        .range(0, Some(3))
        .data()
        .unwrap();
    assert!(sorted_first.iter().all(|p| price(p) == 812));

    let paged_first = store
        .select_all()
        .range(0, Some(3))
        .order_by([("price", Direction::Desc)])
        .data()
        .unwrap();
    assert_eq!(ids(&paged_first), vec![3, 1, 2]);
}

#[test]
fn less_than_or_equal() {
    let store = product_store();
    let rows = store
        .select_all()
        .lte("price", 612)
        .unwrap()
        .order_by(["id"])
        .data()
        .unwrap();
    assert_eq!(rows, products_where(|p| price(p) <= 612));
}

#[test]
fn less_than() {
    let store = product_store();
    let rows = store
        .select_all()
        .lt("price", 612)
        .unwrap()
        .order_by(["id"])
        .data()
        .unwrap();
    assert_eq!(rows, products_where(|p| price(p) < 612));
}

#[test]
fn greater_than_or_equal() {
    let store = product_store();
    let rows = store
        .select_all()
        .gte("price", 612)
        .unwrap()
        .order_by(["id"])
        .data()
        .unwrap();
    assert_eq!(rows, products_where(|p| price(p) >= 612));
}

#[test]
fn greater_than_or_equal_to_maximum_includes_it() {
    let store = product_store();
    let rows = store.select_all().gte("price", 812).unwrap().data().unwrap();
    assert_eq!(by_id(rows), products_where(|p| price(p) == 812));
    assert!(store.select_all().gt("price", 812).unwrap().data().unwrap().is_empty());
}

#[test]
fn greater_than() {
    let store = product_store();
    let rows = store
        .select_all()
        .gt("price", 612)
        .unwrap()
        .order_by(["id"])
        .data()
        .unwrap();
    assert_eq!(rows, products_where(|p| price(p) > 612));
}

#[test]
fn between_is_closed() {
    let store = product_store();
    let query = store.select_all().between("price", [500, 700]).unwrap();
    assert_eq!(
        query.explain(),
        AccessPath::Index {
            field: "price".into(),
            op: Operator::Between
        }
    );
    let rows = query.order_by(["id"]).data().unwrap();
    assert_eq!(rows, products_where(|p| (500..=700).contains(&price(p))));
}

#[test]
fn not_between_on_shared_index() {
    let store = product_store();
    let rows = store
        .select_all()
        .nbetween("price", [500, 700])
        .unwrap()
        .order_by(["id"])
        .data()
        .unwrap();
    assert_eq!(rows, products_where(|p| price(p) < 500 || price(p) > 700));
}

#[test]
fn not_between_on_unique_index() {
    let store = product_store();
    let query = store.select_all().nbetween("id", [5, 40]).unwrap();
    assert!(matches!(query.explain(), AccessPath::Index { ref field, .. } if field == "id"));
    let rows = query.data().unwrap();
    assert_eq!(ids(&rows), vec![1, 2, 3, 4, 41, 42, 43, 44, 45, 46, 47, 48]);
}

#[test]
fn not_between_combines_with_later_filters() {
    let store = product_store();
    let rows = store
        .select_all()
        .nbetween("price", [200, 800])
        .unwrap()
        .eq("category", "Vegetable")
        .unwrap()
        .data()
        .unwrap();
    assert_eq!(
        by_id(rows),
        products_where(|p| category(p) == "Vegetable" && !(200..=800).contains(&price(p)))
    );
}

#[test]
fn key_membership_with_range() {
    let store = product_store();
    let keys = [1, 2, 3, 4, 7, 8, 9, 10];
    let rows = store
        .select_all()
        .in_("id", keys)
        .unwrap()
        .range(0, Some(10))
        .order_by(["id"])
        .data()
        .unwrap();
    assert_eq!(
        rows,
        products_where(|p| keys.contains(&p.get("id").as_integer().unwrap_or_default()))
    );
}

#[test]
fn price_membership() {
    let store = product_store();
    let rows = store
        .select_all()
        .in_("price", [1, 2, 3, 4, 7, 8, 9, 10])
        .unwrap()
        .data()
        .unwrap();
    assert!(rows.is_empty());

    let rows = store
        .select_all()
        .in_("price", [812, 118, 812])
        .unwrap()
        .order_by(["id"])
        .data()
        .unwrap();
    assert_eq!(rows, products_where(|p| price(p) == 812 || price(p) == 118));
}

#[test]
fn price_exclusion_with_range() {
    let store = product_store();
    let excluded = [112, 512];
    let rows = store
        .select_all()
        .nin("price", excluded)
        .unwrap()
        .range(0, Some(10))
        .order_by(["id"])
        .data()
        .unwrap();
    let expected = products_where(|p| !excluded.contains(&price(p)));
    assert_eq!(rows, expected[..10].to_vec());
}

#[test]
fn count_matches_data() {
    let store = product_store();
    assert_eq!(store.select_all().count().unwrap(), PRODUCTS.len());
    assert_eq!(store.select_all().range(40, None).count().unwrap(), 2);

    let query = store
        .select_all()
        .eq("category", "Fruit")
        .unwrap()
        .range(5, Some(4));
    assert_eq!(query.count().unwrap(), query.data().unwrap().len());
    assert_eq!(query.count().unwrap(), 4);
}

#[test]
fn first_row_shortcut() {
    let store = product_store();
    let rows = store.select_all().range(0, Some(1)).data().unwrap();
    assert_eq!(ids(&rows), vec![1]);
}

#[test]
fn residual_scan_on_unindexed_field() {
    let store = product_store();
    let query = store.select_all().eq("name", "Milk").unwrap();
    assert_eq!(query.explain(), AccessPath::Scan);
    assert_eq!(query.data().unwrap(), products_where(|p| p.get("name").as_text() == Some("Milk")));
}

#[test]
fn missing_field_matches_null() {
    let store = product_store();
    let favourites = store.select_all().eq("fav", true).unwrap().count().unwrap();
    let others = store.select_all().eq("fav", ()).unwrap().count().unwrap();
    assert_eq!(favourites, 3);
    assert_eq!(favourites + others, PRODUCTS.len());
}

#[test]
fn update_then_delete_one_product() {
    let store = product_store();
    let mut expected = store.get(11).unwrap();
    expected.set("price", 122);

    let updated = store
        .where_()
        .eq("id", 11)
        .unwrap()
        .update(doc! { "price" => 122 })
        .unwrap();
    assert_eq!(updated, vec![expected.clone()]);
    assert_eq!(store.get(11), Some(expected.clone()));

    let removed = store.where_().eq("id", 11).unwrap().delete().unwrap();
    assert_eq!(removed, vec![expected]);
    assert_eq!(store.select_all().eq("id", 11).unwrap().single().unwrap(), None);
    assert_consistent(&store);
}

#[test]
fn where_range_limits_targets() {
    let store = product_store();
    let removed = store
        .where_()
        .eq("category", "Dairy")
        .unwrap()
        .range(1, Some(2))
        .delete()
        .unwrap();
    let dairy = products_where(|p| category(p) == "Dairy");
    assert_eq!(removed, dairy[1..3].to_vec());
    assert_eq!(store.select_all().eq("category", "Dairy").unwrap().count().unwrap(), 5);
    assert_consistent(&store);
}

#[test]
fn misuse_is_reported() {
    let store = product_store();

    let err = store.select_all().order_by(["id"]).eq("id", 1).unwrap_err();
    assert!(matches!(err, StoreError::Action { .. }));

    let err = store.select_all().range(0, None).lt("price", 1).unwrap_err();
    assert!(matches!(err, StoreError::Action { .. }));

    let empty: [i64; 0] = [];
    let err = store.select_all().in_("id", empty).unwrap_err();
    assert!(matches!(err, StoreError::Value { .. }));

    let err = store.select_all().between("price", [1, 2, 3]).unwrap_err();
    assert!(matches!(err, StoreError::Value { .. }));

    let err = store.select_all().update(doc! { "price" => 1 }).unwrap_err();
    assert!(matches!(err, StoreError::Action { .. }));

    let err = store.where_().data().unwrap_err();
    assert!(matches!(err, StoreError::Action { .. }));

    let err = store.where_().order_by(["id"]).delete().unwrap_err();
    assert!(matches!(err, StoreError::Action { .. }));
    assert_eq!(store.len(), PRODUCTS.len());
}
