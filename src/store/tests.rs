use super::memory::MemoryKv;
use super::{
    CascadeReport, PersistenceError, RecordSource, RecordStore, StoreError, ACTIVITIES_KEY,
    APPLICATIONS_KEY, COLLECTION_KEYS, CROPS_KEY, FARMS_KEY, RECOMMENDATIONS_KEY,
};
use crate::domain::records::{NewApplication, NewCrop, NewFarm};
use crate::domain::treatment::TreatmentType;
use crate::knowledge::KnowledgeBase;
use crate::recommend::recommend_for_all;
use time::macros::datetime;

const CREATED_AT: &str = "2024-06-01T08:00:00Z";

fn knowledge() -> KnowledgeBase {
    KnowledgeBase::load().expect("builtin knowledge should parse")
}

fn new_farm(name: &str, code: &str) -> NewFarm {
    NewFarm {
        name: name.to_string(),
        farm_code: code.to_string(),
        location: Some("Valley Road".to_string()),
        size: Some(40.0),
        soil_type: None,
    }
}

fn new_crop(farm_id: &str, crop_type: &str) -> NewCrop {
    NewCrop {
        crop_type: crop_type.to_string(),
        farm_id: farm_id.to_string(),
        planting_date: "2024-06-01".to_string(),
        area: 2.5,
        ..NewCrop::default()
    }
}

fn new_application(crop_id: &str, product: &str) -> NewApplication {
    NewApplication {
        crop_id: crop_id.to_string(),
        treatment_type: TreatmentType::Fertilizer,
        product_name: product.to_string(),
        quantity: 12.5,
        unit: "kg".to_string(),
        date: "2024-06-05".to_string(),
        growth_stage: Some("seedling".to_string()),
        method: None,
        weather: None,
        purpose: None,
        notes: None,
    }
}

#[test]
fn farm_codes_are_unique_ignoring_case_at_creation() {
    let mut store = RecordStore::default();
    let farm = store
        .add_farm(new_farm("North", "NF-01"), CREATED_AT)
        .expect("first farm should be created");
    assert!(farm.id.starts_with("farm-"));
    assert_eq!(farm.location, "Valley Road");

    let duplicate = store.add_farm(new_farm("Other", "nf-01"), CREATED_AT);
    assert!(matches!(
        duplicate,
        Err(StoreError::Validation(ref message)) if message.contains("already exists")
    ));
    assert_eq!(store.farms().len(), 1);

    let previous = store
        .rename_farm(&farm.id, "  North Paddock ")
        .expect("rename should succeed");
    assert_eq!(previous, "North");
    assert_eq!(store.farms()[0].name, "North Paddock");
    assert_eq!(store.farms()[0].farm_code, "NF-01");
}

#[test]
fn farm_requires_name_and_code() {
    let mut store = RecordStore::default();
    assert!(matches!(
        store.add_farm(new_farm(" ", "X"), CREATED_AT),
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(
        store.add_farm(new_farm("North", ""), CREATED_AT),
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(
        store.rename_farm("farm-none", "Name"),
        Err(StoreError::NotFound { kind: "farm", .. })
    ));
}

#[test]
fn crop_names_resolve_from_knowledge_or_custom_input() {
    let kb = knowledge();
    let mut store = RecordStore::default();
    let farm = store
        .add_farm(new_farm("North", "NF"), CREATED_AT)
        .expect("farm");

    let wheat = store
        .add_crop(new_crop(&farm.id, "Wheat"), &kb, CREATED_AT)
        .expect("wheat");
    assert_eq!(wheat.crop_type, "wheat");
    assert_eq!(wheat.name, "Wheat");
    assert_eq!(wheat.status, "Active");

    let unknown = store
        .add_crop(new_crop(&farm.id, "barley"), &kb, CREATED_AT)
        .expect("barley");
    assert_eq!(unknown.name, "barley");

    let missing_name = store.add_crop(new_crop(&farm.id, "other"), &kb, CREATED_AT);
    assert!(matches!(missing_name, Err(StoreError::Validation(_))));

    let mut custom_input = new_crop(&farm.id, "other");
    custom_input.custom_name = Some("Saffron".to_string());
    custom_input.planting_date = "2024-06-02T10:00:00Z".to_string();
    let custom = store
        .add_crop(custom_input, &kb, CREATED_AT)
        .expect("custom crop");
    assert_eq!(custom.name, "Saffron");
    assert_eq!(custom.planting_date, "2024-06-02");
}

#[test]
fn invalid_crop_input_leaves_store_untouched() {
    let kb = knowledge();
    let mut store = RecordStore::default();
    let farm = store
        .add_farm(new_farm("North", "NF"), CREATED_AT)
        .expect("farm");

    let mut bad_date = new_crop(&farm.id, "corn");
    bad_date.planting_date = "06/01/2024".to_string();
    let err = store.add_crop(bad_date, &kb, CREATED_AT).unwrap_err();
    assert!(err.to_string().contains("invalid date"));

    let mut bad_harvest = new_crop(&farm.id, "corn");
    bad_harvest.harvest_date = Some("later".to_string());
    assert!(store.add_crop(bad_harvest, &kb, CREATED_AT).is_err());

    let mut no_area = new_crop(&farm.id, "corn");
    no_area.area = 0.0;
    assert!(store.add_crop(no_area, &kb, CREATED_AT).is_err());

    let orphan = store.add_crop(new_crop("farm-missing", "corn"), &kb, CREATED_AT);
    assert!(matches!(
        orphan,
        Err(StoreError::NotFound { kind: "farm", ref id }) if id == "farm-missing"
    ));

    assert!(store.crops().is_empty());
}

#[test]
fn applications_require_an_existing_crop_and_positive_quantity() {
    let kb = knowledge();
    let mut store = RecordStore::default();
    let farm = store
        .add_farm(new_farm("North", "NF"), CREATED_AT)
        .expect("farm");
    let crop = store
        .add_crop(new_crop(&farm.id, "corn"), &kb, CREATED_AT)
        .expect("crop");

    assert!(matches!(
        store.add_application(new_application("crop-missing", "Urea"), CREATED_AT),
        Err(StoreError::NotFound { kind: "crop", .. })
    ));
    let mut zero = new_application(&crop.id, "Urea");
    zero.quantity = 0.0;
    assert!(matches!(
        store.add_application(zero, CREATED_AT),
        Err(StoreError::Validation(_))
    ));

    let created = store
        .add_application(new_application(&crop.id, " Urea "), CREATED_AT)
        .expect("application");
    assert_eq!(created.product_name, "Urea");
    assert_eq!(store.list_applications(&crop.id).len(), 1);

    let previous = store
        .rename_application(&created.id, "Urea 46%")
        .expect("rename");
    assert_eq!(previous, "Urea");
    assert_eq!(store.applications()[0].product_name, "Urea 46%");
}

#[test]
fn deleting_a_farm_removes_exactly_its_crops_and_their_applications() {
    let kb = knowledge();
    let mut store = RecordStore::default();
    let doomed = store
        .add_farm(new_farm("Doomed", "D"), CREATED_AT)
        .expect("farm");
    let kept = store.add_farm(new_farm("Kept", "K"), CREATED_AT).expect("farm");

    let first = store
        .add_crop(new_crop(&doomed.id, "corn"), &kb, CREATED_AT)
        .expect("crop");
    let second = store
        .add_crop(new_crop(&doomed.id, "rice"), &kb, CREATED_AT)
        .expect("crop");
    let survivor = store
        .add_crop(new_crop(&kept.id, "wheat"), &kb, CREATED_AT)
        .expect("crop");
    for (crop_id, product) in [
        (&first.id, "Urea"),
        (&first.id, "NPK"),
        (&second.id, "Butachlor"),
        (&survivor.id, "Tebuconazole"),
    ] {
        store
            .add_application(new_application(crop_id, product), CREATED_AT)
            .expect("application");
    }

    let (removed, report) = store.delete_farm(&doomed.id).expect("delete");
    assert_eq!(removed.name, "Doomed");
    assert_eq!(
        report,
        CascadeReport {
            farms: 1,
            crops: 2,
            applications: 3,
        }
    );
    assert_eq!(store.farms().len(), 1);
    assert_eq!(store.crops().len(), 1);
    assert_eq!(store.crops()[0].id, survivor.id);
    assert_eq!(store.applications().len(), 1);
    assert_eq!(store.applications()[0].crop_id, survivor.id);
}

#[test]
fn deleting_a_crop_cascades_but_deleting_an_application_does_not() {
    let kb = knowledge();
    let mut store = RecordStore::default();
    let farm = store
        .add_farm(new_farm("North", "NF"), CREATED_AT)
        .expect("farm");
    let corn = store
        .add_crop(new_crop(&farm.id, "corn"), &kb, CREATED_AT)
        .expect("crop");
    let rice = store
        .add_crop(new_crop(&farm.id, "rice"), &kb, CREATED_AT)
        .expect("crop");
    let corn_app = store
        .add_application(new_application(&corn.id, "Urea"), CREATED_AT)
        .expect("application");
    store
        .add_application(new_application(&corn.id, "NPK"), CREATED_AT)
        .expect("application");
    store
        .add_application(new_application(&rice.id, "Urea"), CREATED_AT)
        .expect("application");

    let removed = store
        .delete_application(&corn_app.id)
        .expect("delete application");
    assert_eq!(removed.id, corn_app.id);
    assert_eq!(store.crops().len(), 2);
    assert_eq!(store.applications().len(), 2);

    let (_, report) = store.delete_crop(&corn.id).expect("delete crop");
    assert_eq!(report.crops, 1);
    assert_eq!(report.applications, 1);
    assert_eq!(store.farms().len(), 1);
    assert_eq!(store.applications().len(), 1);
    assert_eq!(store.applications()[0].crop_id, rice.id);

    let (_, report) = store.delete_farm(&farm.id).expect("delete farm");
    assert_eq!(report.crops, 1);
    assert_eq!(report.applications, 1);
}

#[test]
fn save_and_load_reproduce_every_collection_in_order() {
    let kb = knowledge();
    let mut store = RecordStore::default();
    let farm = store
        .add_farm(new_farm("North", "NF"), CREATED_AT)
        .expect("farm");
    let mut with_harvest = new_crop(&farm.id, "wheat");
    with_harvest.harvest_date = Some("2024-06-20".to_string());
    with_harvest.variety = Some("Red winter".to_string());
    let wheat = store
        .add_crop(with_harvest, &kb, CREATED_AT)
        .expect("crop");
    store
        .add_crop(new_crop(&farm.id, "corn"), &kb, CREATED_AT)
        .expect("crop");
    store
        .add_application(new_application(&wheat.id, "Urea"), CREATED_AT)
        .expect("application");
    store.record_activity("Added farm".to_string(), None, CREATED_AT, 100);
    store.record_activity("Added crop".to_string(), Some(wheat.id.as_str()), CREATED_AT, 100);
    let feed = recommend_for_all(&store, &kb, datetime!(2024-06-03 09:00 UTC));
    assert!(!feed.items.is_empty());
    store.set_recommendation_cache(feed.items);

    let mut kv = MemoryKv::default();
    store.save(&mut kv).expect("save");
    let reloaded = RecordStore::load(&kv).expect("load");

    assert_eq!(reloaded.farms(), store.farms());
    assert_eq!(reloaded.crops(), store.crops());
    assert_eq!(reloaded.applications(), store.applications());
    assert_eq!(reloaded.activities(), store.activities());
    assert_eq!(reloaded.recommendation_cache(), store.recommendation_cache());

    let mut second = MemoryKv::default();
    reloaded.save(&mut second).expect("second save");
    for key in COLLECTION_KEYS {
        assert_eq!(kv.raw(key), second.raw(key), "collection {key} changed");
    }
}

#[test]
fn failed_save_leaves_earlier_collections_written_and_memory_intact() {
    let kb = knowledge();
    let mut store = RecordStore::default();
    let farm = store
        .add_farm(new_farm("North", "NF"), CREATED_AT)
        .expect("farm");
    let crop = store
        .add_crop(new_crop(&farm.id, "corn"), &kb, CREATED_AT)
        .expect("crop");
    store
        .add_application(new_application(&crop.id, "Urea"), CREATED_AT)
        .expect("application");

    let mut kv = MemoryKv::default();
    kv.failing_on(APPLICATIONS_KEY);
    let err = store.save(&mut kv).unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Unavailable { ref key, .. } if key == APPLICATIONS_KEY
    ));
    assert!(kv.raw(FARMS_KEY).is_some());
    assert!(kv.raw(CROPS_KEY).is_some());
    assert!(kv.raw(APPLICATIONS_KEY).is_none());
    assert!(kv.raw(ACTIVITIES_KEY).is_none());
    assert_eq!(store.applications().len(), 1);

    kv.clear_failure();
    store.save(&mut kv).expect("retry should succeed");
    let reloaded = RecordStore::load(&kv).expect("load");
    assert_eq!(reloaded.applications().len(), 1);
}

#[test]
fn missing_keys_load_empty_and_corrupt_keys_are_reported() {
    let empty = RecordStore::load(&MemoryKv::default()).expect("empty load");
    assert!(empty.farms().is_empty());
    assert!(empty.recommendation_cache().is_empty());

    let mut kv = MemoryKv::default();
    kv.insert_raw(FARMS_KEY, "[]");
    kv.insert_raw(CROPS_KEY, "{not json");
    match RecordStore::load(&kv) {
        Err(PersistenceError::Corrupt { key, .. }) => assert_eq!(key, CROPS_KEY),
        other => panic!("expected corrupt crops collection, got {other:?}"),
    }
}

#[test]
fn stale_recommendation_snapshot_is_dropped_on_load() {
    let mut kv = MemoryKv::default();
    kv.insert_raw(
        FARMS_KEY,
        r#"[{"id":"farm-1","name":"North","farm_code":"N1","created_at":"2024-06-01T08:00:00Z"}]"#,
    );
    kv.insert_raw(RECOMMENDATIONS_KEY, r#"[{"legacy":true}]"#);

    let store = RecordStore::load(&kv).expect("farm records still load");
    assert_eq!(store.farms().len(), 1);
    assert!(store.recommendation_cache().is_empty());

    kv.insert_raw(RECOMMENDATIONS_KEY, "not json");
    assert!(RecordStore::load(&kv).is_ok());
}

#[test]
fn indexes_are_rebuilt_after_load() {
    let kb = knowledge();
    let mut store = RecordStore::default();
    let farm = store
        .add_farm(new_farm("North", "NF"), CREATED_AT)
        .expect("farm");
    let crop = store
        .add_crop(new_crop(&farm.id, "corn"), &kb, CREATED_AT)
        .expect("crop");
    store
        .add_application(new_application(&crop.id, "Urea"), CREATED_AT)
        .expect("application");
    let mut kv = MemoryKv::default();
    store.save(&mut kv).expect("save");

    let mut reloaded = RecordStore::load(&kv).expect("load");
    let (_, report) = reloaded.delete_farm(&farm.id).expect("delete");
    assert_eq!(report.crops, 1);
    assert_eq!(report.applications, 1);
    assert!(reloaded.crops().is_empty());
    assert!(reloaded.applications().is_empty());
}

#[test]
fn activity_log_is_newest_first_and_capped() {
    let mut store = RecordStore::default();
    for index in 0..4 {
        store.record_activity(format!("entry {index}"), None, CREATED_AT, 3);
    }
    let messages = store
        .activities()
        .iter()
        .map(|entry| entry.message.as_str())
        .collect::<Vec<_>>();
    assert_eq!(messages, vec!["entry 3", "entry 2", "entry 1"]);
}
