use cookiestash::base::clock::ManualClock;
use cookiestash::cookies::codec::{decode_cookie, encode_cookie, CookieRecord};
use cookiestash::cookies::cookie::Cookie;
use cookiestash::cookies::store::PersistentCookieStore;
use cookiestash::storage::memory::MemoryStore;
use cookiestash::storage::sqlite::SqliteStore;
use cookiestash::storage::{KeyValueStore, WriteBatch};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;
use url::Url;

const NOW: i64 = 1_700_000_000_000;
const DAY: i64 = 86_400_000;

fn persistent(name: &str, value: &str, domain: &str, expires_at: i64) -> Cookie {
    Cookie::builder()
        .name(name)
        .value(value)
        .domain(domain)
        .expires_at(expires_at)
        .build()
        .unwrap()
}

fn store_over(storage: Arc<dyn KeyValueStore>, clock: Arc<ManualClock>) -> PersistentCookieStore {
    PersistentCookieStore::builder()
        .clock(clock)
        .build(storage)
        .unwrap()
}

#[test]
fn test_codec_roundtrip_all_flag_combinations() {
    for bits in 0u8..8 {
        let mut builder = Cookie::builder()
            .name("n")
            .value("v=1")
            .path("/p")
            .expires_at(NOW + DAY);
        builder = if bits & 1 != 0 {
            builder.host_only_domain("www.example.com")
        } else {
            builder.domain("example.com")
        };
        if bits & 2 != 0 {
            builder = builder.secure();
        }
        if bits & 4 != 0 {
            builder = builder.http_only();
        }
        let cookie = builder.build().unwrap();

        let decoded = decode_cookie(&encode_cookie(&cookie)).unwrap();
        assert_eq!(CookieRecord::from(&decoded), CookieRecord::from(&cookie));
    }
}

#[test]
fn test_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cookies.db");
    let clock = Arc::new(ManualClock::new(NOW));

    {
        let storage = Arc::new(SqliteStore::open(&path, "cookie_prefs").unwrap());
        let store = store_over(storage, clock.clone());
        store
            .save("example.com", vec![persistent("token", "abc", "example.com", NOW + DAY)])
            .unwrap();
    }

    let storage = Arc::new(SqliteStore::open(&path, "cookie_prefs").unwrap());
    let store = store_over(storage, clock);
    let loaded = store.load("example.com");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].value(), "abc");
    assert_eq!(loaded[0].expires_at(), NOW + DAY);
}

#[test]
fn test_session_cookie_is_never_persisted() {
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = store_over(storage.clone(), clock.clone());

    let session = Cookie::builder()
        .name("sid")
        .value("1")
        .host_only_domain("example.com")
        .build()
        .unwrap();
    store.save("example.com", vec![session]).unwrap();

    assert!(storage.is_empty());
    assert!(store.load("example.com").is_empty());

    let restarted = store_over(storage, clock);
    assert!(restarted.load("example.com").is_empty());
}

#[test]
fn test_comma_named_cookie_never_reaches_storage() {
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = store_over(storage.clone(), clock.clone());
    let url = Url::parse("https://example.com/").unwrap();

    let cookies: Vec<Cookie> = ["a,b=1; Max-Age=3600", "c=2; Max-Age=3600"]
        .iter()
        .filter_map(|line| Cookie::parse(&url, line, NOW))
        .collect();
    store.save("example.com", cookies).unwrap();

    let restarted = store_over(storage, clock);
    let names: Vec<String> = restarted
        .load("example.com")
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, vec!["c"]);
    assert_eq!(restarted.load("example.com"), store.load("example.com"));
}

#[test]
fn test_identity_collapse_leaves_one_record() {
    let storage = Arc::new(MemoryStore::new());
    let store = store_over(storage.clone(), Arc::new(ManualClock::new(NOW)));

    store
        .save(
            "example.com",
            vec![
                persistent("a", "1", "example.com", NOW + DAY),
                persistent("a", "2", "example.com", NOW + DAY),
            ],
        )
        .unwrap();

    let all = storage.all().unwrap();
    let records: Vec<_> = all.keys().filter(|k| k.starts_with("cookie_")).collect();
    assert_eq!(records, vec!["cookie_example.com#a"]);
    assert_eq!(storage.get_string("host_example.com", "").unwrap(), "example.com#a");
    assert_eq!(store.load("example.com")[0].value(), "2");
}

#[test]
fn test_same_name_on_different_domains_are_distinct() {
    let storage = Arc::new(MemoryStore::new());
    let store = store_over(storage.clone(), Arc::new(ManualClock::new(NOW)));

    store
        .save(
            "www.example.com",
            vec![
                persistent("a", "1", "example.com", NOW + DAY),
                persistent("a", "2", "www.example.com", NOW + DAY),
            ],
        )
        .unwrap();

    assert_eq!(store.load("www.example.com").len(), 2);
    assert_eq!(
        storage.get_string("host_www.example.com", "").unwrap(),
        "example.com#a,www.example.com#a"
    );
}

#[test]
fn test_remove_then_reload() {
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = store_over(storage.clone(), clock.clone());

    let c = persistent("a", "1", "example.com", NOW + DAY);
    store.save("example.com", vec![c.clone()]).unwrap();
    store.remove("example.com", &c).unwrap();

    assert!(store.load("example.com").is_empty());
    assert!(!storage.contains("cookie_example.com#a").unwrap());
    assert!(store_over(storage, clock).load("example.com").is_empty());
}

#[test]
fn test_expired_cookie_filtered_on_load_but_kept_until_sweep() {
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = store_over(storage.clone(), clock.clone());

    store
        .save("example.com", vec![persistent("a", "1", "example.com", NOW + 1_000)])
        .unwrap();
    clock.advance(2_000);

    // load filters, but does not evict: the record is still on disk.
    assert!(store.load("example.com").is_empty());
    assert!(storage.contains("cookie_example.com#a").unwrap());
    assert_eq!(store.total_cookie_count(), 1);

    // The next construction sweeps it.
    let restarted = store_over(storage.clone(), clock);
    assert_eq!(restarted.total_cookie_count(), 0);
    assert!(!storage.contains("cookie_example.com#a").unwrap());
    assert!(!storage.contains("host_example.com").unwrap());
}

#[test]
fn test_sweep_on_construction() {
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(NOW));

    let expired = persistent("old", "1", "example.com", NOW - DAY);
    let valid = persistent("new", "2", "example.com", NOW + DAY);
    let mut batch = WriteBatch::new();
    batch
        .put_string("host_example.com", "example.com#old,example.com#new")
        .put_string("cookie_example.com#old", encode_cookie(&expired))
        .put_string("cookie_example.com#new", encode_cookie(&valid));
    storage.apply(batch).unwrap();

    let store = store_over(storage.clone(), clock);
    let loaded = store.load("example.com");
    assert_eq!(loaded, vec![valid]);
    assert_eq!(store.total_cookie_count(), 1);

    assert!(!storage.contains("cookie_example.com#old").unwrap());
    assert!(storage.contains("cookie_example.com#new").unwrap());
    assert_eq!(storage.get_string("host_example.com", "").unwrap(), "example.com#new");
}

#[test]
fn test_corrupt_and_missing_records_are_skipped() {
    let storage = Arc::new(MemoryStore::new());
    let valid = persistent("ok", "1", "example.com", NOW + DAY);

    let mut batch = WriteBatch::new();
    batch
        .put_string(
            "host_example.com",
            "example.com#bad,example.com#gone,example.com#ok",
        )
        .put_string("cookie_example.com#bad", "zz-not-hex")
        .put_string("cookie_example.com#ok", encode_cookie(&valid));
    storage.apply(batch).unwrap();

    let store = store_over(storage, Arc::new(ManualClock::new(NOW)));
    assert_eq!(store.load("example.com"), vec![valid]);
}

#[test]
fn test_clear_wipes_everything() {
    let storage = Arc::new(MemoryStore::new());
    let store = store_over(storage.clone(), Arc::new(ManualClock::new(NOW)));

    store
        .save("a.com", vec![persistent("x", "1", "a.com", NOW + DAY)])
        .unwrap();
    store
        .save("b.com", vec![persistent("y", "2", "b.com", NOW + DAY)])
        .unwrap();

    store.clear().unwrap();
    assert!(store.load("a.com").is_empty());
    assert!(store.load("b.com").is_empty());
    assert!(store.cookies().is_empty());
    assert!(storage.all().unwrap().is_empty());
}

#[test]
fn test_sqlite_namespaces_are_isolated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let clock = Arc::new(ManualClock::new(NOW));

    let cookies = store_over(
        Arc::new(SqliteStore::open(&path, "cookie_prefs").unwrap()),
        clock.clone(),
    );
    let settings = SqliteStore::open(&path, "settings").unwrap();
    let mut batch = WriteBatch::new();
    batch.put_string("theme", "dark");
    settings.apply(batch).unwrap();

    cookies
        .save("example.com", vec![persistent("a", "1", "example.com", NOW + DAY)])
        .unwrap();
    cookies.clear().unwrap();

    assert_eq!(settings.get_string("theme", "").unwrap(), "dark");
}

#[test]
fn test_concurrent_saves_keep_list_and_records_paired() {
    let storage = Arc::new(MemoryStore::new());
    let store = Arc::new(store_over(storage.clone(), Arc::new(ManualClock::new(NOW))));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let name = format!("c{}_{}", t, i);
                    store
                        .save("example.com", vec![persistent(&name, "v", "example.com", NOW + DAY)])
                        .unwrap();
                    let _ = store.load("example.com");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.load("example.com").len(), 200);

    let listed = storage.get_string("host_example.com", "").unwrap();
    let ids: Vec<&str> = listed.split(',').collect();
    assert_eq!(ids.len(), 200);
    for id in ids {
        assert!(storage.contains(&format!("cookie_{}", id)).unwrap());
    }
}
