//! Static registry of polled feeds.
//!
//! Each entry ties a feed URL to the category slug its items belong to and the
//! outlet name used to pick extraction strategies. The registry is data, not
//! runtime configuration; adding an outlet means adding an entry here.

use crate::models::FeedSource;

pub const SOURCES: &[FeedSource] = &[
    FeedSource {
        feed_url: "https://www.cnnturk.com/feed/rss/all/news",
        category_slug: "breaking-news",
        source_name: "CNN Türk",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/son-dakika.rss",
        category_slug: "breaking-news",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://www.trthaber.com/manset_articles.rss",
        category_slug: "breaking-news",
        source_name: "TRT Haber",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/gundem",
        category_slug: "agenda",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.sozcu.com.tr/rss/gundem.xml",
        category_slug: "agenda",
        source_name: "Sözcü",
    },
    FeedSource {
        feed_url: "https://www.sabah.com.tr/rss/gundem.xml",
        category_slug: "agenda",
        source_name: "Sabah",
    },
    FeedSource {
        feed_url: "https://www.cumhuriyet.com.tr/rss/gundem.xml",
        category_slug: "agenda",
        source_name: "Cumhuriyet",
    },
    FeedSource {
        feed_url: "https://www.milliyet.com.tr/rss/rssnew/dunyarss.xml",
        category_slug: "world",
        source_name: "Milliyet",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/dunya",
        category_slug: "world",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/dunya.rss",
        category_slug: "world",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://www.sozcu.com.tr/rss/dunya.xml",
        category_slug: "world",
        source_name: "Sözcü",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/siyaset",
        category_slug: "politics",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.milliyet.com.tr/rss/rssnew/siyasetrss.xml",
        category_slug: "politics",
        source_name: "Milliyet",
    },
    FeedSource {
        feed_url: "https://www.sozcu.com.tr/rss/siyaset.xml",
        category_slug: "politics",
        source_name: "Sözcü",
    },
    FeedSource {
        feed_url: "https://www.sozcu.com.tr/rss/ekonomi.xml",
        category_slug: "economy",
        source_name: "Sözcü",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/ekonomi",
        category_slug: "economy",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.milliyet.com.tr/rss/rssnew/ekonomirss.xml",
        category_slug: "economy",
        source_name: "Milliyet",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/ekonomi.rss",
        category_slug: "economy",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://www.bloomberght.com/rss",
        category_slug: "economy",
        source_name: "Bloomberg HT",
    },
    FeedSource {
        feed_url: "https://www.dunya.com/rss",
        category_slug: "business",
        source_name: "Dünya Gazetesi",
    },
    FeedSource {
        feed_url: "https://www.haberturk.com/rss/ekonomi.xml",
        category_slug: "business",
        source_name: "Habertürk",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/teknoloji.rss",
        category_slug: "technology",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://shiftdelete.net/feed",
        category_slug: "technology",
        source_name: "ShiftDelete",
    },
    FeedSource {
        feed_url: "https://www.webtekno.com/rss.xml",
        category_slug: "technology",
        source_name: "Webtekno",
    },
    FeedSource {
        feed_url: "https://www.technopat.net/feed/",
        category_slug: "technology",
        source_name: "Technopat",
    },
    FeedSource {
        feed_url: "https://www.chip.com.tr/rss/anasayfa.xml",
        category_slug: "technology",
        source_name: "Chip",
    },
    FeedSource {
        feed_url: "https://bilimvegelecek.com.tr/index.php/feed/",
        category_slug: "science",
        source_name: "Bilim ve Gelecek",
    },
    FeedSource {
        feed_url: "https://www.bilimkurgukulubu.com/feed/",
        category_slug: "science",
        source_name: "Bilim Kurgu Kulübü",
    },
    FeedSource {
        feed_url: "https://evrimagaci.org/rss.xml",
        category_slug: "science",
        source_name: "Evrim Ağacı",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/saglik",
        category_slug: "health",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.milliyet.com.tr/rss/rssnew/saglikrss.xml",
        category_slug: "health",
        source_name: "Milliyet",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/saglik.rss",
        category_slug: "health",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/egitim",
        category_slug: "education",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.milliyet.com.tr/rss/rssnew/egitimrss.xml",
        category_slug: "education",
        source_name: "Milliyet",
    },
    FeedSource {
        feed_url: "https://www.haberturk.com/rss/spor.xml",
        category_slug: "sports",
        source_name: "Habertürk",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/spor",
        category_slug: "sports",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/spor.rss",
        category_slug: "sports",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://www.sporx.com/_xml/rss.php",
        category_slug: "sports",
        source_name: "Sporx",
    },
    FeedSource {
        feed_url: "https://www.fanatik.com.tr/rss/anasayfa.xml",
        category_slug: "sports",
        source_name: "Fanatik",
    },
    FeedSource {
        feed_url: "https://www.goal.com/tr/feeds/news?fmt=rss",
        category_slug: "football",
        source_name: "Goal",
    },
    FeedSource {
        feed_url: "https://www.mackolik.com/feed/rss/futbol",
        category_slug: "football",
        source_name: "Maçkolik",
    },
    FeedSource {
        feed_url: "https://www.basketbolplus.com/feed/",
        category_slug: "basketball",
        source_name: "Basketbol Plus",
    },
    FeedSource {
        feed_url: "https://www.eurohoops.net/tr/feed/",
        category_slug: "basketball",
        source_name: "Eurohoops",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/magazin",
        category_slug: "entertainment",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.milliyet.com.tr/rss/rssnew/magazinrss.xml",
        category_slug: "entertainment",
        source_name: "Milliyet",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/magazin.rss",
        category_slug: "entertainment",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/kultur-sanat",
        category_slug: "culture-art",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.milliyet.com.tr/rss/rssnew/kultursanatrss.xml",
        category_slug: "culture-art",
        source_name: "Milliyet",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/sanat.rss",
        category_slug: "culture-art",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/yasam",
        category_slug: "lifestyle",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/yasam.rss",
        category_slug: "lifestyle",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/seyahat",
        category_slug: "travel",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.milliyet.com.tr/rss/rssnew/tatilrss.xml",
        category_slug: "travel",
        source_name: "Milliyet",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/otomobil",
        category_slug: "automotive",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.milliyet.com.tr/rss/rssnew/otomobilrss.xml",
        category_slug: "automotive",
        source_name: "Milliyet",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/otomobil.rss",
        category_slug: "automotive",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://www.otoajanda.com/feed/",
        category_slug: "automotive",
        source_name: "Oto Ajanda",
    },
    FeedSource {
        feed_url: "https://www.hurriyet.com.tr/rss/emlak",
        category_slug: "real-estate",
        source_name: "Hürriyet",
    },
    FeedSource {
        feed_url: "https://www.milliyet.com.tr/rss/rssnew/emlakrss.xml",
        category_slug: "real-estate",
        source_name: "Milliyet",
    },
    FeedSource {
        feed_url: "https://www.ntv.com.tr/cevre.rss",
        category_slug: "environment",
        source_name: "NTV",
    },
    FeedSource {
        feed_url: "https://www.yesilist.com/feed/",
        category_slug: "environment",
        source_name: "Yeşilist",
    },
    FeedSource {
        feed_url: "https://www.iha.com.tr/rss/kategori/Guncel/5/",
        category_slug: "local",
        source_name: "İhlas Haber Ajansı",
    },
    FeedSource {
        feed_url: "https://www.haberler.com/rss",
        category_slug: "local",
        source_name: "Haberler.com",
    },
];

/// Taxonomy written into a fresh store: `(slug, display name)`.
pub const DEFAULT_TAXONOMY: &[(&str, &str)] = &[
    ("breaking-news", "Son Dakika"),
    ("agenda", "Gündem"),
    ("world", "Dünya"),
    ("politics", "Politika"),
    ("economy", "Ekonomi"),
    ("business", "İş Dünyası"),
    ("technology", "Teknoloji"),
    ("science", "Bilim"),
    ("health", "Sağlık"),
    ("education", "Eğitim"),
    ("sports", "Spor"),
    ("football", "Futbol"),
    ("basketball", "Basketbol"),
    ("entertainment", "Magazin"),
    ("culture-art", "Kültür Sanat"),
    ("lifestyle", "Yaşam"),
    ("travel", "Seyahat"),
    ("automotive", "Otomobil"),
    ("real-estate", "Emlak"),
    ("environment", "Çevre"),
    ("local", "Yerel"),
];

pub fn all() -> &'static [FeedSource] {
    SOURCES
}
