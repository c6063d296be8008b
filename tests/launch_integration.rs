use std::{fs, io::{Cursor, Write}, path::Path, time::Duration};

use blocklaunch::{
    sha1_hex, AssetSync, ClasspathBuilder, Credentials, Downloader, Events, GameManifest,
    LaunchProfile, NativesExtractor, Os, VersionResolver
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::{write::SimpleFileOptions, ZipWriter};

fn profile(root: &Path, version: &str, server: &MockServer) -> LaunchProfile {
    let mut profile = LaunchProfile::new(root, version, Credentials::default());
    profile.overrides.os = Some(Os::Linux);
    profile.overrides.url.meta = server.uri();
    profile.overrides.url.resource = server.uri();
    profile
}

fn downloader() -> Downloader {
    Downloader::new(Duration::from_secs(5), Events::none()).unwrap()
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_version(server: &MockServer, id: &str, descriptor: serde_json::Value) {
    mount_json(server, "/mc/game/version_manifest.json", serde_json::json!({
        "versions": [{"id": id, "type": "release", "url": format!("{}/v1/packages/{id}.json", server.uri())}]
    })).await;

    mount_json(server, &format!("/v1/packages/{id}.json"), descriptor).await;
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

#[tokio::test]
async fn resolve_and_build_classpath() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_version(&server, "1.14.4", serde_json::json!({
        "id": "1.14.4",
        "assets": "1.14",
        "assetIndex": {"id": "1.14", "url": format!("{}/indexes/1.14.json", server.uri())},
        "mainClass": "net.minecraft.client.main.Main",
        "arguments": {"game": ["--username", "${auth_player_name}"], "jvm": []},
        "libraries": [{
            "name": "com.mojang:brigadier:1.0.17",
            "downloads": {
                "artifact": {
                    "path": "com/mojang/brigadier/1.0.17/brigadier-1.0.17.jar",
                    "url": format!("{}/libs/brigadier-1.0.17.jar", server.uri())
                }
            }
        }]
    })).await;

    Mock::given(method("GET"))
        .and(path("/libs/brigadier-1.0.17.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"brigadier".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let profile = profile(root.path(), "1.14.4", &server);
    let resolver = VersionResolver::new(&profile, downloader());
    let manifest = resolver.resolve("1.14.4").await.unwrap();

    let classpath = ClasspathBuilder::new(&profile, downloader(), Events::none())
        .build(&manifest, None)
        .await
        .unwrap();

    let expected = root.path().join("libraries/com/mojang/brigadier/1.0.17/brigadier-1.0.17.jar");

    assert_eq!(classpath.entries, vec![expected.clone()]);
    assert_eq!(fs::read(expected).unwrap(), b"brigadier");
    assert!(root.path().join("versions/1.14.4/1.14.4.json").exists());
    assert!(root.path().join("cache/json/version_manifest.json").exists());
}

#[tokio::test]
async fn local_descriptor_wins_without_network() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let version_dir = root.path().join("versions/1.8.9");
    fs::create_dir_all(&version_dir).unwrap();
    fs::write(version_dir.join("1.8.9.json"), r#"{
        "id": "1.8.9",
        "assetIndex": {"id": "1.8", "url": "http://unused/1.8.json"},
        "mainClass": "net.minecraft.client.main.Main",
        "minecraftArguments": "--username ${auth_player_name}"
    }"#).unwrap();

    let profile = profile(root.path(), "1.8.9", &server);
    let manifest = VersionResolver::new(&profile, downloader()).resolve("1.8.9").await.unwrap();

    assert_eq!(manifest.id, "1.8.9");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_version_is_fatal() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_json(&server, "/mc/game/version_manifest.json", serde_json::json!({"versions": []})).await;

    let profile = profile(root.path(), "0.0.1", &server);
    let err = VersionResolver::new(&profile, downloader()).resolve("0.0.1").await.unwrap_err();

    assert!(matches!(err.downcast_ref::<blocklaunch::Error>(), Some(blocklaunch::Error::VersionNotFound(_))));
}

#[tokio::test]
async fn cached_manifest_is_used_when_offline() {
    let server = MockServer::start().await;
    let offline = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_version(&server, "1.16.5", serde_json::json!({
        "id": "1.16.5",
        "assetIndex": {"id": "1.16", "url": "http://unused/1.16.json"},
        "mainClass": "net.minecraft.client.main.Main",
        "arguments": {"game": [], "jvm": []}
    })).await;

    let online_profile = profile(root.path(), "1.16.5", &server);
    VersionResolver::new(&online_profile, downloader()).resolve("1.16.5").await.unwrap();

    fs::remove_dir_all(root.path().join("versions")).unwrap();

    // the second server has no routes, the manifest request fails with 404
    let offline_profile = profile(root.path(), "1.16.5", &offline);
    let manifest = VersionResolver::new(&offline_profile, downloader()).resolve("1.16.5").await.unwrap();

    assert_eq!(manifest.id, "1.16.5");
}

#[tokio::test]
async fn missing_manifest_without_cache_is_network_error() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let profile = profile(root.path(), "1.16.5", &server);
    let err = VersionResolver::new(&profile, downloader()).resolve("1.16.5").await.unwrap_err();

    assert!(matches!(err.downcast_ref::<blocklaunch::Error>(), Some(blocklaunch::Error::Network { .. })));
}

#[tokio::test]
async fn legacy_assets_are_downloaded_and_copied() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let hash = "deadbeef00000000000000000000000000000000";

    mount_json(&server, "/indexes/legacy.json", serde_json::json!({
        "objects": {"x": {"hash": hash, "size": 4}}
    })).await;

    Mock::given(method("GET"))
        .and(path(format!("/de/{hash}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let manifest: GameManifest = serde_json::from_value(serde_json::json!({
        "id": "1.5.2",
        "assets": "legacy",
        "assetIndex": {"id": "legacy", "url": format!("{}/indexes/legacy.json", server.uri())},
        "mainClass": "net.minecraft.client.Minecraft",
        "minecraftArguments": "${auth_player_name} ${auth_session}"
    })).unwrap();

    let profile = profile(root.path(), "1.5.2", &server);
    AssetSync::new(&profile, downloader(), Events::none())
        .sync(&manifest)
        .await
        .unwrap();

    assert_eq!(fs::read(root.path().join(format!("assets/objects/de/{hash}"))).unwrap(), b"data");
    assert_eq!(fs::read(root.path().join("resources/x")).unwrap(), b"data");
    assert!(root.path().join("assets/indexes/legacy.json").exists());
}

#[tokio::test]
async fn valid_assets_are_not_downloaded_again() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let hash = sha1_hex(b"sound");

    mount_json(&server, "/indexes/5.json", serde_json::json!({
        "objects": {"minecraft/sounds/a.ogg": {"hash": hash, "size": 5}}
    })).await;

    let object_dir = root.path().join("assets/objects").join(&hash[0..2]);
    fs::create_dir_all(&object_dir).unwrap();
    fs::write(object_dir.join(&hash), b"sound").unwrap();

    let manifest: GameManifest = serde_json::from_value(serde_json::json!({
        "id": "1.20.1",
        "assets": "5",
        "assetIndex": {"id": "5", "url": format!("{}/indexes/5.json", server.uri())},
        "mainClass": "net.minecraft.client.main.Main",
        "arguments": {"game": [], "jvm": []}
    })).unwrap();

    let profile = profile(root.path(), "1.20.1", &server);
    AssetSync::new(&profile, downloader(), Events::none())
        .sync(&manifest)
        .await
        .unwrap();

    // only the index was requested
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert!(!root.path().join("resources").exists());
}

#[tokio::test]
async fn missing_asset_index_is_an_error() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let manifest: GameManifest = serde_json::from_value(serde_json::json!({
        "id": "1.20.1",
        "assetIndex": {"id": "5", "url": format!("{}/indexes/5.json", server.uri())},
        "mainClass": "net.minecraft.client.main.Main",
        "arguments": {"game": [], "jvm": []}
    })).unwrap();

    let profile = profile(root.path(), "1.20.1", &server);
    let err = AssetSync::new(&profile, downloader(), Events::none())
        .sync(&manifest)
        .await
        .unwrap_err();

    assert!(matches!(err.downcast_ref::<blocklaunch::Error>(), Some(blocklaunch::Error::AssetIndexMissing(_))));
}

#[tokio::test]
async fn library_with_bad_checksum_is_fetched_again() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/libs/guava.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"good".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let jar = root.path().join("libraries/com/google/guava/guava/21.0/guava-21.0.jar");
    fs::create_dir_all(jar.parent().unwrap()).unwrap();
    fs::write(&jar, b"bad").unwrap();

    let manifest: GameManifest = serde_json::from_value(serde_json::json!({
        "id": "1.12.2",
        "assetIndex": {"id": "1.12", "url": "http://unused/1.12.json"},
        "mainClass": "net.minecraft.client.main.Main",
        "minecraftArguments": "--username ${auth_player_name}",
        "libraries": [{
            "name": "com.google.guava:guava:21.0",
            "downloads": {"artifact": {
                "url": format!("{}/libs/guava.jar", server.uri()),
                "sha1": sha1_hex(b"good")
            }}
        }]
    })).unwrap();

    let profile = profile(root.path(), "1.12.2", &server);
    let classpath = ClasspathBuilder::new(&profile, downloader(), Events::none())
        .build(&manifest, None)
        .await
        .unwrap();

    assert_eq!(classpath.entries, vec![jar.clone()]);
    assert_eq!(fs::read(&jar).unwrap(), b"good");
}

#[tokio::test]
async fn loader_libraries_come_first_and_replace_vanilla() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    for lib in ["asm-9.5.jar", "asm-9.1.jar", "gson-2.10.jar", "universal.jar"] {
        Mock::given(method("GET"))
            .and(path(format!("/libs/{lib}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(lib.as_bytes().to_vec()))
            .mount(&server)
            .await;
    }

    let artifact = |group: &str, name: &str, version: &str, file: &str| serde_json::json!({
        "name": format!("{group}:{name}:{version}"),
        "downloads": {"artifact": {
            "path": format!("{}/{name}/{version}/{name}-{version}.jar", group.replace('.', "/")),
            "url": format!("{}/libs/{file}", server.uri())
        }}
    });

    let manifest: GameManifest = serde_json::from_value(serde_json::json!({
        "id": "1.20.1",
        "assetIndex": {"id": "5", "url": "http://unused/5.json"},
        "mainClass": "net.minecraft.client.main.Main",
        "arguments": {"game": [], "jvm": []},
        "libraries": [
            artifact("org.ow2.asm", "asm", "9.1", "asm-9.1.jar"),
            artifact("com.google.code.gson", "gson", "2.10", "gson-2.10.jar")
        ]
    })).unwrap();

    let custom: blocklaunch::LoaderManifest = serde_json::from_value(serde_json::json!({
        "id": "loader",
        "libraries": [
            artifact("org.ow2.asm", "asm", "9.5", "asm-9.5.jar"),
            artifact("org.ow2.asm", "asm", "9.5", "asm-9.5.jar")
        ],
        "mavenFiles": [artifact("net.minecraftforge", "forge", "47.1.0", "universal.jar")]
    })).unwrap();

    let profile = profile(root.path(), "1.20.1", &server);
    let classpath = ClasspathBuilder::new(&profile, downloader(), Events::none())
        .build(&manifest, Some(&custom))
        .await
        .unwrap();

    let libs = root.path().join("libraries");

    assert_eq!(classpath.entries, vec![
        libs.join("com/google/code/gson/gson/2.10/gson-2.10.jar"),
        libs.join("org/ow2/asm/asm/9.5/asm-9.5.jar")
    ]);
    assert!(libs.join("net/minecraftforge/forge/47.1.0/forge-47.1.0.jar").exists());
}

#[tokio::test]
async fn natives_are_extracted_and_archive_removed() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let jar = zip_bytes(&[
        ("liblwjgl.so", b"elf"),
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0")
    ]);

    Mock::given(method("GET"))
        .and(path("/natives/lwjgl-platform-2.9.4-natives-linux.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jar))
        .expect(1)
        .mount(&server)
        .await;

    let manifest: GameManifest = serde_json::from_value(serde_json::json!({
        "id": "1.12.2",
        "assetIndex": {"id": "1.12", "url": "http://unused/1.12.json"},
        "mainClass": "net.minecraft.client.main.Main",
        "minecraftArguments": "--username ${auth_player_name}",
        "libraries": [{
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
            "natives": {"linux": "natives-linux"},
            "extract": {"exclude": ["META-INF/"]},
            "downloads": {"classifiers": {"natives-linux": {
                "path": "org/lwjgl/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives-linux.jar",
                "url": format!("{}/natives/lwjgl-platform-2.9.4-natives-linux.jar", server.uri())
            }}}
        }]
    })).unwrap();

    let profile = profile(root.path(), "1.12.2", &server);
    let natives_dir = NativesExtractor::new(&profile, downloader(), Events::none())
        .materialize(&manifest)
        .await
        .unwrap();

    assert_eq!(natives_dir, root.path().join("natives/1.12.2"));
    assert_eq!(fs::read(natives_dir.join("liblwjgl.so")).unwrap(), b"elf");
    assert!(!natives_dir.join("META-INF").exists());
    assert!(!natives_dir.join("lwjgl-platform-2.9.4-natives-linux.jar").exists());

    // a populated natives directory is reused as is
    let again = NativesExtractor::new(&profile, downloader(), Events::none())
        .materialize(&manifest)
        .await
        .unwrap();
    assert_eq!(again, natives_dir);
}

#[tokio::test]
async fn modern_versions_skip_natives() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let manifest: GameManifest = serde_json::from_value(serde_json::json!({
        "id": "1.20.1",
        "assetIndex": {"id": "5", "url": "http://unused/5.json"},
        "mainClass": "net.minecraft.client.main.Main",
        "arguments": {"game": [], "jvm": []}
    })).unwrap();

    let profile = profile(root.path(), "1.20.1", &server);
    let dir = NativesExtractor::new(&profile, downloader(), Events::none())
        .materialize(&manifest)
        .await
        .unwrap();

    assert_eq!(dir, root.path());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_library_name_is_skipped() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/libs/good.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"good".to_vec()))
        .mount(&server)
        .await;

    let manifest: GameManifest = serde_json::from_value(serde_json::json!({
        "id": "1.12.2",
        "assetIndex": {"id": "1.12", "url": "http://unused/1.12.json"},
        "mainClass": "net.minecraft.client.main.Main",
        "minecraftArguments": "--username ${auth_player_name}",
        "libraries": [
            {
                "name": "good:lib:1",
                "downloads": {"artifact": {
                    "path": "good/lib/1/lib-1.jar",
                    "url": format!("{}/libs/good.jar", server.uri())
                }}
            },
            {
                "name": "oddname",
                "downloads": {"artifact": {"url": format!("{}/libs/odd.jar", server.uri())}}
            }
        ]
    })).unwrap();

    let profile = profile(root.path(), "1.12.2", &server);
    let classpath = ClasspathBuilder::new(&profile, downloader(), Events::none())
        .build(&manifest, None)
        .await
        .unwrap();

    assert_eq!(classpath.entries, vec![root.path().join("libraries/good/lib/1/lib-1.jar")]);
}

#[tokio::test]
async fn library_rules_follow_the_os_table() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    for lib in ["except-osx.jar", "only-osx.jar"] {
        Mock::given(method("GET"))
            .and(path(format!("/libs/{lib}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(lib.as_bytes().to_vec()))
            .mount(&server)
            .await;
    }

    let manifest: GameManifest = serde_json::from_value(serde_json::json!({
        "id": "1.12.2",
        "assetIndex": {"id": "1.12", "url": "http://unused/1.12.json"},
        "mainClass": "net.minecraft.client.main.Main",
        "minecraftArguments": "--username ${auth_player_name}",
        "libraries": [
            {
                "name": "rules:except-osx:1",
                "rules": [{"action": "allow", "os": {"name": "osx"}}],
                "downloads": {"artifact": {"url": format!("{}/libs/except-osx.jar", server.uri())}}
            },
            {
                "name": "rules:only-osx:1",
                "rules": [{"action": "allow"}, {"action": "disallow", "os": {"name": "osx"}}],
                "downloads": {"artifact": {"url": format!("{}/libs/only-osx.jar", server.uri())}}
            }
        ]
    })).unwrap();

    let libs = root.path().join("libraries/rules");

    let linux = profile(root.path(), "1.12.2", &server);
    let classpath = ClasspathBuilder::new(&linux, downloader(), Events::none())
        .build(&manifest, None)
        .await
        .unwrap();
    assert_eq!(classpath.entries, vec![libs.join("except-osx/1/except-osx-1.jar")]);

    let mut osx = profile(root.path(), "1.12.2", &server);
    osx.overrides.os = Some(Os::Osx);
    let classpath = ClasspathBuilder::new(&osx, downloader(), Events::none())
        .build(&manifest, None)
        .await
        .unwrap();
    assert_eq!(classpath.entries, vec![libs.join("only-osx/1/only-osx-1.jar")]);
}

#[tokio::test]
async fn asset_paths_cannot_escape_resources() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let hash = sha1_hex(b"data");
    let evil = sha1_hex(b"evil");

    mount_json(&server, "/indexes/legacy.json", serde_json::json!({
        "objects": {
            "../escaped": {"hash": evil, "size": 4},
            "lang/en_US.lang": {"hash": hash, "size": 4}
        }
    })).await;

    for (hash, body) in [(&hash, b"data"), (&evil, b"evil")] {
        Mock::given(method("GET"))
            .and(path(format!("/{}/{hash}", &hash[0..2])))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&server)
            .await;
    }

    let manifest: GameManifest = serde_json::from_value(serde_json::json!({
        "id": "1.5.2",
        "assets": "legacy",
        "assetIndex": {"id": "legacy", "url": format!("{}/indexes/legacy.json", server.uri())},
        "mainClass": "net.minecraft.client.Minecraft",
        "minecraftArguments": "${auth_player_name} ${auth_session}"
    })).unwrap();

    let profile = profile(root.path(), "1.5.2", &server);
    AssetSync::new(&profile, downloader(), Events::none())
        .sync(&manifest)
        .await
        .unwrap();

    assert_eq!(fs::read(root.path().join("resources/lang/en_US.lang")).unwrap(), b"data");
    assert!(!root.path().join("escaped").exists());
}
