//! Project manifests and asset contents used across integration tests

use serde_json::{Value, json};

/// Contents served for an asset key
pub fn asset_bytes(key: &str) -> Vec<u8> {
    format!("asset:{key}").into_bytes()
}

/// Scratch 3.0 manifest with two targets sharing a costume and a sound
pub fn sb3_manifest() -> Value {
    json!({
        "targets": [
            {
                "isStage": true,
                "name": "Stage",
                "costumes": [
                    {"name": "backdrop1", "assetId": "cd21514d0531fdffb22204e0ec5ed84a", "md5ext": "cd21514d0531fdffb22204e0ec5ed84a.svg", "dataFormat": "svg"}
                ],
                "sounds": [
                    {"name": "pop", "assetId": "83a9787d4cb6f3b7632b4ddfebf74367", "md5ext": "83a9787d4cb6f3b7632b4ddfebf74367.wav", "dataFormat": "wav"}
                ]
            },
            {
                "isStage": false,
                "name": "Sprite1",
                "costumes": [
                    {"name": "costume1", "assetId": "bcf454acf82e4504149f7ffe07081dbc", "md5ext": "bcf454acf82e4504149f7ffe07081dbc.svg", "dataFormat": "svg"},
                    {"name": "backdrop copy", "assetId": "cd21514d0531fdffb22204e0ec5ed84a", "md5ext": "cd21514d0531fdffb22204e0ec5ed84a.svg", "dataFormat": "svg"}
                ],
                "sounds": [
                    {"name": "pop", "assetId": "83a9787d4cb6f3b7632b4ddfebf74367", "md5ext": "83a9787d4cb6f3b7632b4ddfebf74367.wav", "dataFormat": "wav"}
                ]
            }
        ],
        "meta": {"semver": "3.0.0"}
    })
}

/// Asset keys referenced by [`sb3_manifest`], without duplicates
pub const SB3_ASSETS: [&str; 3] = [
    "cd21514d0531fdffb22204e0ec5ed84a.svg",
    "83a9787d4cb6f3b7632b4ddfebf74367.wav",
    "bcf454acf82e4504149f7ffe07081dbc.svg",
];

/// Scratch 2.0 manifest with stale IDs and one costume shared by stage and sprite
pub fn sb2_manifest() -> Value {
    json!({
        "objName": "Stage",
        "penLayerMD5": "5c81a336fab8be57adc039a8a2b33ca9.png",
        "penLayerID": 0,
        "costumes": [
            {"costumeName": "backdrop1", "baseLayerID": 3, "baseLayerMD5": "739b5e2a2435f6e1ec2993791b423146.png"}
        ],
        "sounds": [],
        "children": [
            {
                "objName": "Sprite1",
                "costumes": [
                    {"costumeName": "costume1", "baseLayerID": 1, "baseLayerMD5": "f9a1c175dbe2e5dee472858dd30d16bb.svg"},
                    {"costumeName": "backdrop", "baseLayerID": 3, "baseLayerMD5": "739b5e2a2435f6e1ec2993791b423146.png"}
                ],
                "sounds": [
                    {"soundName": "meow", "soundID": 7, "md5": "83c36d806dc92327b9e7049a565c6bff.wav"}
                ]
            }
        ]
    })
}

/// Asset keys referenced by [`sb2_manifest`], without duplicates
pub const SB2_ASSETS: [&str; 4] = [
    "5c81a336fab8be57adc039a8a2b33ca9.png",
    "739b5e2a2435f6e1ec2993791b423146.png",
    "f9a1c175dbe2e5dee472858dd30d16bb.svg",
    "83c36d806dc92327b9e7049a565c6bff.wav",
];

/// A Scratch 1.x project body
pub fn sb_body() -> Vec<u8> {
    let mut body = b"ScratchV01".to_vec();
    body.extend_from_slice(&[0x4f, 0x62, 0x6a, 0x53, 0x01, 0x53, 0x74, 0x63, 0x68]);
    body
}
