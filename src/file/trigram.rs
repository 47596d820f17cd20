//! Letter-trigram frequency table for pronounceable password generation.
//!
//! The table counts three-letter windows over a corpus of common English
//! words.  Generation walks it like a second-order Markov chain: seed
//! from the full distribution, then repeatedly draw a continuation
//! conditioned on the last two letters.  Built once on first use.

use std::sync::OnceLock;

/// Corpus the trigram counts are drawn from.  Lowercase ASCII words
/// only; anything else is skipped when counting.
static CORPUS: &str = "\
    abandon ability able about above absent absorb abstract accent accept \
    access accident account accuse achieve acid acquire across action active \
    actor actual adapt address adjust admit adopt advance advice affair affect \
    afford afraid after again against agency agent agree ahead alarm album \
    alert alive allow almost alone along already also alter although always \
    amazing among amount analyze ancient anger angle animal announce annual \
    another answer anxiety anybody anyone anything apart apology appear apple \
    apply appoint approve area argue around arrange arrest arrive article \
    artist aspect assault asset assign assist assume atom attach attack \
    attempt attend attract auction author autumn avenue average avoid awake \
    award aware away badge balance ballot banana band bank banner bargain \
    barrel basic basket battle beach bear beauty became because become \
    bedroom before began begin behave behind believe belong below bench \
    benefit beside better between beyond bicycle billion bind biology bird \
    birth bitter black blade blame blanket blind block blood board boat body \
    boil bold bone bonus book border boring borrow boss both bottle bottom \
    bounce bound bowl brain branch brand brave bread break breath brick \
    bridge brief bright bring broad broken bronze brother brought brown \
    brush bubble budget build bullet bundle burden burn burst business busy \
    butter button buyer cabin cable cake call calm camera camp cancel candle \
    candy canvas capable capital captain capture carbon card career careful \
    cargo carpet carry carve case cast casual catch cattle caught cause \
    caution cave cease ceiling cell cement center central century cereal \
    certain chain chair chalk chamber chance change channel chapter charge \
    charity charm chart chase cheap check cheese chest chicken chief child \
    choice choose chosen chronic chunk church circle citizen city civil \
    claim clap clarify class clause clay clean clear clerk clever click \
    client climb clinic clock close cloth cloud club clue cluster coach \
    coal coast coat code coffee coin cold collect college color column \
    combine come comfort command comment common company compare compete \
    complex concept concern concert conduct confirm connect consider \
    consist constant contact contain content contest context control \
    convert convince cook cool copper copy coral core corner correct cost \
    cotton could council count country couple courage course court cousin \
    cover craft crane crash crazy cream create credit crew cricket crime \
    crisp critic crop cross crowd crucial cruel cruise crumble crush cry \
    crystal culture cup curious current curtain curve cushion custom cycle \
    daily damage dance danger daring dark data date dawn deal debate debris \
    decade decent decide declare decline decorate decrease deep defeat \
    defend define degree delay deliver demand denial dentist deny depart \
    depend deposit depth deputy derive describe desert design desk despair \
    destroy detail detect develop device devote diagram dial diamond diary \
    diet differ digital dignity dilemma dinner direct dirt disagree discover \
    disease dish dismiss display distance divert divide divorce dizzy doctor \
    document dog dollar domain donate donkey donor door double doubt dozen \
    draft dragon drama drastic draw dream dress drift drill drink drip drive \
    drop drum dry duck dumb dune during dust duty dwarf dynamic eager eagle \
    early earn earth easily east easy echo ecology economy edge edit educate \
    effort eight either elbow elder electric elegant element elephant \
    elevator elite else embark embody embrace emerge emotion employ empower \
    empty enable enact end endless endorse enemy energy enforce engage \
    engine enhance enjoy enlist enough enrich enroll ensure enter entire \
    entry envelope episode equal equip era erase erode erosion error erupt \
    escape essay essence estate eternal ethics evidence evil evoke evolve \
    exact example excess exchange excite exclude excuse execute exercise \
    exhaust exhibit exile exist exit exotic expand expect expire explain \
    expose express extend extra eye fabric face faculty fade faint faith \
    fall false fame family famous fancy fantasy farm fashion fatal father \
    fatigue fault favorite feature federal fee feed feel female fence \
    festival fetch fever few fiber fiction field figure file film filter \
    final find fine finger finish fire firm first fiscal fish fit fitness \
    fix flag flame flash flat flavor flee flight flip float flock floor \
    flower fluid flush fly foam focus fog foil fold follow food foot force \
    forest forget fork fortune forum forward fossil foster found fox \
    fragile frame frequent fresh friend fringe frog front frost frown \
    frozen fruit fuel fun funny furnace fury future gadget gain galaxy \
    gallery game gap garage garbage garden garlic garment gas gasp gate \
    gather gauge gaze general genius genre gentle genuine gesture ghost \
    giant gift giggle ginger giraffe girl give glad glance glare glass \
    glide glimpse globe gloom glory glove glow glue goat goddess gold good \
    goose gorilla gospel gossip govern gown grab grace grain grant grape \
    grass gravity great green grid grief grit grocery group grow grunt \
    guard guess guide guilt guitar gun habit hair half hammer hamster hand \
    happy harbor hard harsh harvest hat have hawk hazard head health heart \
    heavy hedgehog height hello helmet help hen hero hidden high hill hint \
    hip hire history hobby hockey hold hole holiday hollow home honey hood \
    hope horn horror horse hospital host hotel hour hover hub huge human \
    humble humor hundred hungry hunt hurdle hurry hurt husband hybrid ice \
    icon idea identify idle ignore ill illegal illness image imitate immense \
    immune impact impose improve impulse inch include income increase index \
    indicate indoor industry infant inflict inform inhale inherit initial \
    inject injury inmate inner innocent input inquiry insane insect inside \
    inspire install intact interest into invest invite involve iron island \
    isolate issue item ivory jacket jaguar jar jazz jealous jeans jelly \
    jewel job join joke journey joy judge juice jump jungle junior junk \
    just kangaroo keen keep ketchup key kick kid kidney kind kingdom kiss \
    kit kitchen kite kitten kiwi knee knife knock know lab label labor \
    ladder lady lake lamp language laptop large later latin laugh laundry \
    lava law lawn lawsuit layer lazy leader leaf learn leave lecture left \
    leg legal legend leisure lemon lend length lens leopard lesson letter \
    level liar liberty library license life lift light like limb limit link \
    lion liquid list little live lizard load loan lobster local lock logic \
    lonely long loop lottery loud lounge love loyal lucky luggage lumber \
    lunar lunch luxury lyrics machine mad magic magnet maid mail main major \
    make mammal man manage mandate mango mansion manual maple marble march \
    margin marine market marriage mask mass master match material math \
    matrix matter maximum maze meadow mean measure meat mechanic medal \
    media melody melt member memory mention menu mercy merge merit merry \
    mesh message metal method middle midnight milk million mimic mind \
    minimum minor minute miracle mirror misery miss mistake mix mixture \
    mobile model modify mom moment monitor monkey monster month moon moral \
    more morning mosquito mother motion motor mountain mouse move movie \
    much muffin mule multiply muscle museum mushroom music must mutual \
    myself mystery myth naive name napkin narrow nasty nation nature near \
    neck need negative neglect neither nephew nerve nest net network \
    neutral never news next nice night noble noise nominee noodle normal \
    north nose notable note nothing notice novel now nuclear number nurse \
    nut oak obey object oblige obscure observe obtain obvious occur ocean \
    october odor offer office often oil okay old olive olympic omit once \
    one onion online only open opera opinion oppose option orange orbit \
    orchard order ordinary organ orient original orphan ostrich other \
    outdoor outer output outside oval oven over own owner oxygen oyster \
    ozone pact paddle page pair palace palm panda panel panic panther \
    paper parade parent park parrot party pass patch path patient patrol \
    pattern pause pave payment peace peanut pear peasant pelican pen \
    penalty pencil people pepper perfect permit person pet phone photo \
    phrase physical piano picnic picture piece pig pigeon pill pilot pink \
    pioneer pipe pistol pitch pizza place planet plastic plate play please \
    pledge pluck plug plunge poem poet point polar pole police pond pony \
    pool popular portion position possible post potato pottery poverty \
    powder power practice praise predict prefer prepare present pretty \
    prevent price pride primary print priority prison private prize \
    problem process produce profit program project promote proof property \
    prosper protect proud provide public pudding pull pulp pulse pumpkin \
    punch pupil puppy purchase purity purpose purse push put puzzle \
    pyramid quality quantum quarter question quick quit quiz quote rabbit \
    raccoon race rack radar radio rail rain raise rally ramp ranch random \
    range rapid rare rate rather raven raw razor ready real reason rebel \
    rebuild recall receive recipe record recycle reduce reflect reform \
    refuse region regret regular reject relax release relief rely remain \
    remember remind remove render renew rent reopen repair repeat replace \
    report require rescue resemble resist resource response result retire \
    retreat return reunion reveal review reward rhythm rib ribbon rice \
    rich ride ridge rifle right rigid ring riot ripple risk ritual rival \
    river road roast robot robust rocket romance roof rookie room rose \
    rotate rough round route royal rubber rude rug rule run runway rural \
    sad saddle sadness safe sail salad salmon salon salt salute same \
    sample sand satisfy satoshi sauce sausage save say scale scan scare \
    scatter scene scheme school science scissors scorpion scout scrap \
    screen script scrub sea search season seat second secret section \
    security seed seek segment select sell seminar senior sense sentence \
    series service session settle setup seven shadow shaft shallow share \
    shed shell sheriff shield shift shine ship shiver shock shoe shoot \
    shop short shoulder shove shrimp shrug shuffle shy sibling sick side \
    siege sight sign silent silk silly silver similar simple since sing \
    siren sister situate six size skate sketch ski skill skin skirt skull \
    slab slam sleep slender slice slide slight slim slogan slot slow slush \
    small smart smile smoke smooth snack snake snap sniff snow soap soccer \
    social sock soda soft solar soldier solid solution solve someone song \
    soon sorry sort soul sound soup source south space spare spatial spawn \
    speak special speed spell spend sphere spice spider spike spin spirit \
    split spoil sponsor spoon sport spot spray spread spring spy square \
    squeeze squirrel stable stadium staff stage stairs stamp stand start \
    state stay steak steel stem step stereo stick still sting stock \
    stomach stone stool story stove strategy street strike strong \
    struggle student stuff stumble style subject submit subway success \
    such sudden suffer sugar suggest suit summer sun sunny sunset super \
    supply supreme sure surface surge surprise surround survey suspect \
    sustain swallow swamp swap swarm swear sweet swift swim swing switch \
    sword symbol symptom syrup system table tackle tag tail talent talk \
    tank tape target task taste tattoo taxi teach team tell ten tenant \
    tennis tent term test text thank that theme then theory there they \
    thing this thought three thrive throw thumb thunder ticket tide tiger \
    tilt timber time tiny tip tired tissue title toast tobacco today \
    toddler toe together toilet token tomato tomorrow tone tongue tonight \
    tool tooth top topic topple torch tornado tortoise toss total tourist \
    toward tower town toy track trade traffic tragic train transfer trap \
    trash travel tray treat tree trend trial tribe trick trigger trim \
    trip trophy trouble truck true truly trumpet trust truth try tube \
    tuition tumble tuna tunnel turkey turn turtle twelve twenty twice \
    twin twist two type typical ugly umbrella unable unaware uncle under \
    undo unfair unfold unhappy uniform unique unit universe unknown \
    unlock until unusual unveil update upgrade uphold upon upper upset \
    urban urge usage use used useful useless usual utility vacant vacuum \
    vague valid valley valve van vanish vapor various vast vault vehicle \
    velvet vendor venture venue verb verify version very vessel veteran \
    viable vibrant vicious victory video view village vintage violin \
    virtual virus visa visit visual vital vivid vocal voice void volcano \
    volume vote voyage wage wagon wait walk wall walnut want warfare warm \
    warrior wash wasp waste water wave way wealth weapon wear weasel \
    weather web wedding weekend weird welcome west wet whale what wheat \
    wheel when where whip whisper wide width wife wild will win window \
    wine wing wink winner winter wire wisdom wise wish witness wolf woman \
    wonder wood wool word work world worry worth wrap wreck wrestle wrist \
    write wrong yard year yellow young youth zebra zero zone zoo";

pub(crate) struct TrigramTable {
    freq: Box<[[[u32; 26]; 26]; 26]>,
    sigma: u64,
}

impl TrigramTable {
    /// The shared table, built on first use.
    pub fn get() -> &'static TrigramTable {
        static TABLE: OnceLock<TrigramTable> = OnceLock::new();
        TABLE.get_or_init(TrigramTable::build)
    }

    fn build() -> Self {
        let mut freq = Box::new([[[0u32; 26]; 26]; 26]);
        let mut sigma = 0u64;
        for word in CORPUS.split_whitespace() {
            let bytes = word.as_bytes();
            for win in bytes.windows(3) {
                if win.iter().all(u8::is_ascii_lowercase) {
                    let (c1, c2, c3) = (
                        (win[0] - b'a') as usize,
                        (win[1] - b'a') as usize,
                        (win[2] - b'a') as usize,
                    );
                    freq[c1][c2][c3] += 1;
                    sigma += 1;
                }
            }
        }
        Self { freq, sigma }
    }

    pub fn freq(&self, c1: usize, c2: usize, c3: usize) -> u32 {
        self.freq[c1][c2][c3]
    }

    /// Sum of all trigram frequencies.
    pub fn sigma(&self) -> u64 {
        self.sigma
    }

    /// Sum of the 26 continuations of the digraph (c1, c2).
    pub fn row_sum(&self, c1: usize, c2: usize) -> u64 {
        self.freq[c1][c2].iter().map(|&f| u64::from(f)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_populated() {
        let table = TrigramTable::get();
        assert!(table.sigma() > 1000);
        // "the" is the most ordinary trigram there is.
        assert!(table.freq(19, 7, 4) > 0);
    }

    #[test]
    fn sigma_matches_cell_total() {
        let table = TrigramTable::get();
        let mut total = 0u64;
        for c1 in 0..26 {
            for c2 in 0..26 {
                total += table.row_sum(c1, c2);
            }
        }
        assert_eq!(total, table.sigma());
    }
}
