//! Known blocking functions per platform.

use crate::frame::Platform;

/// Packages and the functions in them that block when called
pub type FunctionsByPackage = &'static [(&'static str, &'static [&'static str])];

/// One exact-frame detection rule
#[derive(Debug, Clone, Copy)]
pub struct ExactFrameRule {
    pub issue_title: &'static str,
    /// Only search the active (main/UI) thread
    pub active_thread_only: bool,
    pub functions_by_package: FunctionsByPackage,
}

impl ExactFrameRule {
    pub fn matches(&self, package: &str, function: &str) -> bool {
        self.functions_by_package
            .iter()
            .any(|(p, functions)| *p == package && functions.contains(&function))
    }
}

pub const SYNC_FUNCTION_ON_MAIN_THREAD: &str = "Synchronous function called on main thread";
pub const FILE_IO_ON_MAIN_THREAD: &str = "File I/O function called on main thread";

const NODE_FS_SYNC: FunctionsByPackage = &[(
    "node:fs",
    &[
        "accessSync",
        "appendFileSync",
        "chmodSync",
        "chownSync",
        "closeSync",
        "copyFileSync",
        "cpSync",
        "existsSync",
        "fchmodSync",
        "fchownSync",
        "fdatasyncSync",
        "fstatSync",
        "fsyncSync",
        "ftruncateSync",
        "futimesSync",
        "lchmodSync",
        "lchownSync",
        "linkSync",
        "lstatSync",
        "lutimesSync",
        "mkdirSync",
        "mkdtempSync",
        "openSync",
        "opendirSync",
        "readFileSync",
        "readSync",
        "readdirSync",
        "readlinkSync",
        "readvSync",
        "realpathSync",
        "realpathSync.native",
        "renameSync",
        "rmSync",
        "rmdirSync",
        "statSync",
        "symlinkSync",
        "truncateSync",
        "unlinkSync",
        "utimesSync",
        "writeFileSync",
        "writeSync",
        "writevSync",
    ],
)];

const COCOA_FILE_IO: FunctionsByPackage = &[
    ("AppleJPEG", &["applejpeg_decode_image_all"]),
    (
        "AttributeGraph",
        &["AG::LayoutDescriptor::make_layout(AG::swift::metadata const*, AGComparisonMode, AG::LayoutDescriptor::HeapMode)"],
    ),
    (
        "CoreData",
        &[
            "-[NSManagedObjectContext countForFetchRequest:error:]",
            "-[NSManagedObjectContext executeFetchRequest:error:]",
            "-[NSManagedObjectContext executeRequest:error:]",
            "-[NSManagedObjectContext mergeChangesFromContextDidSaveNotification:]",
            "-[NSManagedObjectContext obtainPermanentIDsForObjects:error:]",
            "-[NSManagedObjectContext performBlockAndWait:]",
            "-[NSManagedObjectContext save:]",
            "NSManagedObjectContext.fetch<A>(NSFetchRequest<A>)",
        ],
    ),
    (
        "CoreFoundation",
        &[
            "CFReadStreamRead",
            "CFURLConnectionSendSynchronousRequest",
            "CFURLCreateData",
            "CFURLCreateDataAndPropertiesFromResource",
            "CFURLWriteDataAndPropertiesToResource",
            "CFWriteStreamWrite",
        ],
    ),
    (
        "CoreML",
        &[
            "+[MLModel modelWithContentsOfURL:configuration:error:]",
            "-[MLNeuralNetworkEngine predictionFromFeatures:options:error:]",
        ],
    ),
    ("CoreAutoLayout", &["-[NSISEngine withBehaviors:performModifications:]"]),
    (
        "Foundation",
        &[
            "+[NSJSONSerialization JSONObjectWithStream:options:error:]",
            "+[NSJSONSerialization writeJSONObject:toStream:options:error:]",
            "+[NSRegularExpression regularExpressionWithPattern:options:error:]",
            "+[NSURLConnection sendSynchronousRequest:returningResponse:error:]",
            "-[NSData(NSData) initWithContentsOfMappedFile:]",
            "-[NSData(NSData) initWithContentsOfURL:]",
            "-[NSData(NSData) initWithContentsOfURL:options:maxLength:error:]",
            "-[NSData(NSData) writeToFile:atomically:]",
            "-[NSData(NSData) writeToFile:atomically:error:]",
            "-[NSData(NSData) writeToFile:options:error:]",
            "-[NSData(NSData) writeToURL:atomically:]",
            "-[NSData(NSData) writeToURL:options:error:]",
            "-[NSFileManager contentsAtPath:]",
            "-[NSFileManager createFileAtPath:contents:attributes:]",
            "-[NSISEngine performModifications:withUnsatisfiableConstraintsHandler:]",
            "-[NSISEngine withBehaviors:performModifications:]",
            "-[NSRegularExpression initWithPattern:options:error:]",
            "@nonobjc NSData.init(contentsOf: URL, options: NSDataReadingOptions)",
            "Data.init(contentsOf: __shared URL, options: NSDataReadingOptions)",
            "JSONDecoder.decode<A>(_: A.Type, from: Any)",
            "JSONDecoder.decode<A>(_: A.Type, from: Data)",
            "JSONDecoder.decode<A>(_: A.Type, jsonData: Data, logErrors: Bool)",
            "JSONEncoder.encode<A>(A)",
            "NSFileManager.contents(atURL: URL)",
        ],
    ),
    (
        "ImageIO",
        &[
            "DecodeImageData",
            "DecodeImageStream",
            "GIFReadPlugin::DoDecodeImageData(IIOImageReadSession*, GlobalGIFInfo*, ReadPluginData const&, GIFPluginData const&, unsigned char*, unsigned long, std::__1::shared_ptr<GIFBufferInfo>, long*)",
            "IIOImageProviderInfo::CopyImageBlockSetWithOptions(void*, CGImageProvider*, CGRect, CGSize, __CFDictionary const*)",
            "LZWDecode",
            "NeXTDecode",
            "PNGReadPlugin::DecodeFrameStandard(IIOImageReadSession*, ReadPluginData const&, PNGPluginData const&, IIODecodeFrameParams&)",
            "VP8Decode",
            "VP8DecodeMB",
            "WebPDecode",
            "jpeg_huff_decode",
        ],
    ),
    (
        "libcompression.dylib",
        &[
            "BrotliDecoderDecompress",
            "brotli_encode_buffer",
            "lz4_decode",
            "lz4_decode_asm",
            "lzfseDecode",
            "lzfseEncode",
            "lzfseStreamDecode",
            "lzfseStreamEncode",
            "lzvnDecode",
            "lzvnEncode",
            "lzvnStreamDecode",
            "lzvnStreamEncode",
            "zlibDecodeBuffer",
            "zlib_decode_buffer",
            "zlib_encode_buffer",
        ],
    ),
    (
        "libsqlite3.dylib",
        &[
            "sqlite3_blob_read",
            "sqlite3_column_blob",
            "sqlite3_column_bytes",
            "sqlite3_column_double",
            "sqlite3_column_int",
            "sqlite3_column_int64",
            "sqlite3_column_text",
            "sqlite3_column_text16",
            "sqlite3_column_value",
            "sqlite3_step",
            "sqlite3_value_blob",
            "sqlite3_value_double",
            "sqlite3_value_int",
            "sqlite3_value_int64",
            "sqlite3_value_pointer",
            "sqlite3_value_text",
            "sqlite3_value_text16",
            "sqlite3_value_text16be",
            "sqlite3_value_text16le",
        ],
    ),
    (
        "libswiftCoreData.dylib",
        &[
            "NSManagedObjectContext.count<A>(for: NSFetchRequest<A>)",
            "NSManagedObjectContext.fetch<A>(NSFetchRequest<A>)",
            "NSManagedObjectContext.perform<A>(schedule: NSManagedObjectContext.ScheduledTaskType, _: ())",
        ],
    ),
    (
        "libswiftFoundation.dylib",
        &["__JSONDecoder.decode<A>(A.Type)", "__JSONEncoder.encode<A>(A)"],
    ),
    ("libsystem_c.dylib", &["__fread", "fread"]),
    ("libxpc.dylib", &["xpc_connection_send_message_with_reply_sync"]),
    (
        "QuartzCore",
        &[
            "CA::Layer::layout_and_display_if_needed(CA::Transaction*)",
            "CA::Layer::layout_if_needed(CA::Transaction*)",
        ],
    ),
    (
        "SwiftUI",
        &[
            "UnaryLayoutEngine.sizeThatFits(_ProposedSize)",
            "ViewRendererHost.render(interval: Double, updateDisplayList: Bool)",
            "ViewRendererHost.updateViewGraph<A>(body: (ViewGraph))",
        ],
    ),
    ("UIKit", &["-[UINib instantiateWithOwner:options:]"]),
];

const NODE_RULES: &[ExactFrameRule] = &[ExactFrameRule {
    issue_title: SYNC_FUNCTION_ON_MAIN_THREAD,
    active_thread_only: true,
    functions_by_package: NODE_FS_SYNC,
}];

const COCOA_RULES: &[ExactFrameRule] = &[ExactFrameRule {
    issue_title: FILE_IO_ON_MAIN_THREAD,
    active_thread_only: true,
    functions_by_package: COCOA_FILE_IO,
}];

/// Exact-frame rules for a platform, empty when none are known
pub fn rules_for(platform: Platform) -> &'static [ExactFrameRule] {
    match platform {
        Platform::Node => NODE_RULES,
        Platform::Cocoa => COCOA_RULES,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_lookup() {
        let rule = rules_for(Platform::Node)[0];
        assert!(rule.matches("node:fs", "readFileSync"));
        assert!(rule.matches("node:fs", "realpathSync.native"));
        assert!(!rule.matches("node:fs", "readFile"));
        assert!(!rule.matches("fs", "readFileSync"));
    }

    #[test]
    fn test_cocoa_dylib_packages() {
        let rule = rules_for(Platform::Cocoa)[0];
        assert!(rule.matches("libsqlite3.dylib", "sqlite3_step"));
        assert!(rule.matches("libsystem_c.dylib", "fread"));
    }

    #[test]
    fn test_platform_without_rules() {
        assert!(rules_for(Platform::Python).is_empty());
    }
}
